//! Attribute-driven initialization
//!
//! Fields declare their mask through attributes:
//!
//! ```text
//! data-mask="##/##/####"
//! data-mask-placeholder="_"
//! data-mask-keep-literals="false"
//! ```
//!
//! [`MaskRegistry::init`] creates and mounts a session for every field that
//! carries the mask attribute and files the sessions under a group id, so a
//! whole group can later be updated, refreshed or destroyed together.

use std::collections::BTreeMap;

use inmask_core::{MaskOptions, MaskSession, OptionsPatch, TextSurface};
use tracing::debug;

/// Default attribute holding the mask pattern
pub const MASK_ATTR: &str = "data-mask";
pub const PLACEHOLDER_ATTR: &str = "data-mask-placeholder";
pub const KEEP_LITERALS_ATTR: &str = "data-mask-keep-literals";

/// Read access to a field's attributes
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<String>;
}

/// Options for [`MaskRegistry::init`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    /// Attribute holding the mask pattern
    pub mask_attr: String,
    /// Group id; generated when absent
    pub id: Option<String>,
}

impl Default for InitOptions {
    fn default() -> Self {
        InitOptions {
            mask_attr: MASK_ATTR.to_string(),
            id: None,
        }
    }
}

impl InitOptions {
    pub fn new() -> Self {
        InitOptions::default()
    }

    #[must_use]
    pub fn with_mask_attr(mut self, attr: impl Into<String>) -> Self {
        self.mask_attr = attr.into();
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// What [`MaskRegistry::init`] set up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitResult {
    pub id: String,
    /// Number of sessions in the group
    pub count: usize,
}

/// Sessions created by one `init` call, keyed by the caller's field key
#[derive(Debug)]
pub struct MaskGroup<K, S> {
    mask_attr: String,
    sessions: BTreeMap<K, MaskSession<S>>,
}

impl<K: Ord, S: TextSurface> MaskGroup<K, S> {
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&MaskSession<S>> {
        self.sessions.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut MaskSession<S>> {
        self.sessions.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.sessions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &MaskSession<S>)> {
        self.sessions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut MaskSession<S>)> {
        self.sessions.iter_mut()
    }

    /// Destroy every session and hand back the fields
    fn release(self) -> Vec<(K, S)> {
        self.sessions
            .into_iter()
            .filter_map(|(key, mut session)| {
                let surface = session.unmount();
                session.destroy();
                surface.map(|surface| (key, surface))
            })
            .collect()
    }
}

/// Groups of attribute-initialized sessions
#[derive(Debug)]
pub struct MaskRegistry<K, S> {
    groups: BTreeMap<String, MaskGroup<K, S>>,
    next_id: usize,
}

impl<K, S> Default for MaskRegistry<K, S> {
    fn default() -> Self {
        MaskRegistry {
            groups: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<K: Ord, S: TextSurface + AttributeSource> MaskRegistry<K, S> {
    pub fn new() -> Self {
        MaskRegistry::default()
    }

    /// Mask every field that carries the mask attribute
    ///
    /// Fields without the attribute, or with an empty one, are skipped and not
    /// kept. A later field with the same key as an earlier one is skipped too.
    /// Initializing into an existing group id adds to that group.
    pub fn init(
        &mut self,
        fields: impl IntoIterator<Item = (K, S)>,
        options: &InitOptions,
    ) -> InitResult {
        let id = match &options.id {
            Some(id) => id.clone(),
            None => self.generate_id(),
        };
        let group = self.groups.entry(id.clone()).or_insert_with(|| MaskGroup {
            mask_attr: options.mask_attr.clone(),
            sessions: BTreeMap::new(),
        });

        for (key, field) in fields {
            if group.sessions.contains_key(&key) {
                continue;
            }
            let Some(mask_options) = options_from_attributes(&field, &options.mask_attr) else {
                continue;
            };
            let mut session = MaskSession::new(mask_options);
            session.mount(field);
            group.sessions.insert(key, session);
        }

        debug!(id = %id, count = group.sessions.len(), "mask group initialized");
        InitResult {
            id,
            count: group.sessions.len(),
        }
    }

    pub fn group(&self, id: &str) -> Option<&MaskGroup<K, S>> {
        self.groups.get(id)
    }

    pub fn group_mut(&mut self, id: &str) -> Option<&mut MaskGroup<K, S>> {
        self.groups.get_mut(id)
    }

    /// Ids of the live groups
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Apply an options update to every session in a group
    ///
    /// Returns the number of sessions updated; zero for an unknown id.
    pub fn update(&mut self, id: &str, patch: &OptionsPatch) -> usize {
        let Some(group) = self.groups.get_mut(id) else {
            return 0;
        };
        for session in group.sessions.values_mut() {
            session.update_options(patch.clone());
        }
        group.sessions.len()
    }

    /// Re-read the attributes of every field in a group
    ///
    /// Each field still carrying the mask attribute is remounted on a session
    /// built from its current attributes; fields that lost the attribute are
    /// dropped from the group and returned.
    pub fn refresh(&mut self, id: &str) -> Vec<(K, S)> {
        let Some(group) = self.groups.remove(id) else {
            return Vec::new();
        };
        let mask_attr = group.mask_attr.clone();
        let mut dropped = Vec::new();
        let mut sessions = BTreeMap::new();

        for (key, mut session) in group.sessions {
            let Some(field) = session.unmount() else {
                continue;
            };
            match options_from_attributes(&field, &mask_attr) {
                Some(options) => {
                    let mut fresh = MaskSession::new(options);
                    fresh.mount(field);
                    sessions.insert(key, fresh);
                }
                None => dropped.push((key, field)),
            }
        }

        debug!(id, count = sessions.len(), dropped = dropped.len(), "mask group refreshed");
        self.groups.insert(
            id.to_string(),
            MaskGroup {
                mask_attr,
                sessions,
            },
        );
        dropped
    }

    /// Destroy a group's sessions and hand back its fields
    pub fn destroy(&mut self, id: &str) -> Vec<(K, S)> {
        match self.groups.remove(id) {
            Some(group) => {
                debug!(id, "mask group destroyed");
                group.release()
            }
            None => Vec::new(),
        }
    }

    /// Destroy every group
    pub fn destroy_all(&mut self) -> Vec<(K, S)> {
        let groups = std::mem::take(&mut self.groups);
        groups.into_values().flat_map(MaskGroup::release).collect()
    }

    fn generate_id(&mut self) -> String {
        loop {
            let id = format!("mask-group-{}", self.next_id);
            self.next_id += 1;
            if !self.groups.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Build mask options from a field's attributes
///
/// `None` when the mask attribute is missing or empty. The placeholder is the
/// first character of its attribute; literals are kept unless the attribute
/// is exactly `false`.
pub fn options_from_attributes(field: &impl AttributeSource, mask_attr: &str) -> Option<MaskOptions> {
    let mask = field.attribute(mask_attr).filter(|mask| !mask.is_empty())?;
    let mut options = MaskOptions::new(mask);
    if let Some(placeholder) = field
        .attribute(PLACEHOLDER_ATTR)
        .and_then(|value| value.chars().next())
    {
        options.placeholder = placeholder;
    }
    options.keep_literals = field.attribute(KEEP_LITERALS_ATTR).as_deref() != Some("false");
    Some(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::BufferField;

    fn masked(mask: &str) -> BufferField {
        BufferField::new().with_attribute(MASK_ATTR, mask)
    }

    #[test]
    fn test_options_from_attributes() {
        let field = masked("##/##")
            .with_attribute(PLACEHOLDER_ATTR, "*")
            .with_attribute(KEEP_LITERALS_ATTR, "false");
        let options = options_from_attributes(&field, MASK_ATTR).unwrap();
        assert_eq!(options.mask, "##/##");
        assert_eq!(options.placeholder, '*');
        assert!(!options.keep_literals);

        let defaults = options_from_attributes(&masked("##"), MASK_ATTR).unwrap();
        assert_eq!(defaults.placeholder, '_');
        assert!(defaults.keep_literals);

        assert!(options_from_attributes(&masked(""), MASK_ATTR).is_none());
        assert!(options_from_attributes(&BufferField::new(), MASK_ATTR).is_none());
    }

    #[test]
    fn test_init_generates_ids() {
        let mut registry = MaskRegistry::new();
        let first = registry.init(vec![(1, masked("##"))], &InitOptions::new());
        let second = registry.init(vec![(1, masked("##"))], &InitOptions::new());

        assert_eq!(first.id, "mask-group-0");
        assert_eq!(second.id, "mask-group-1");
        assert_eq!(registry.ids().count(), 2);
    }

    #[test]
    fn test_init_skips_unmasked_fields() {
        let mut registry = MaskRegistry::new();
        let result = registry.init(
            vec![("a", masked("##")), ("b", BufferField::new()), ("a", masked("###"))],
            &InitOptions::new().with_id("form"),
        );
        assert_eq!(result.count, 1);

        let group = registry.group("form").unwrap();
        assert_eq!(group.get(&"a").unwrap().masker().spec().source(), "##");
        assert!(group.get(&"b").is_none());
    }

    #[test]
    fn test_init_masks_existing_text() {
        let mut registry = MaskRegistry::new();
        registry.init(
            vec![(0, masked("##/##").with_text("1234"))],
            &InitOptions::new().with_id("g"),
        );
        let session = registry.group("g").unwrap().get(&0).unwrap();
        assert_eq!(session.surface().unwrap().value(), "12/34");
    }

    #[test]
    fn test_custom_mask_attr() {
        let mut registry = MaskRegistry::new();
        let field = BufferField::new().with_attribute("x-mask", "###");
        let result = registry.init(
            vec![(0, field)],
            &InitOptions::new().with_mask_attr("x-mask"),
        );
        assert_eq!(result.count, 1);
    }

    #[test]
    fn test_update_group() {
        let mut registry = MaskRegistry::new();
        registry.init(
            vec![(0, masked("##-##").with_text("1234"))],
            &InitOptions::new().with_id("g"),
        );
        assert_eq!(registry.update("g", &OptionsPatch::new().mask("##.##")), 1);
        assert_eq!(registry.update("missing", &OptionsPatch::new()), 0);

        let session = registry.group("g").unwrap().get(&0).unwrap();
        assert_eq!(session.masked_value(), "12.34");
    }

    #[test]
    fn test_refresh_picks_up_attribute_changes() {
        let mut registry = MaskRegistry::new();
        registry.init(
            vec![(0, masked("##")), (1, masked("###"))],
            &InitOptions::new().with_id("g"),
        );

        let group = registry.group_mut("g").unwrap();
        let field = group.get_mut(&0).unwrap().surface_mut().unwrap();
        field.set_attribute(MASK_ATTR, "####");
        group
            .get_mut(&1)
            .unwrap()
            .surface_mut()
            .unwrap()
            .remove_attribute(MASK_ATTR);

        let dropped = registry.refresh("g");
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].0, 1);

        let group = registry.group("g").unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group.get(&0).unwrap().masker().spec().source(), "####");
    }

    #[test]
    fn test_destroy_returns_fields() {
        let mut registry = MaskRegistry::new();
        registry.init(
            vec![(0, masked("##").with_text("12"))],
            &InitOptions::new().with_id("a"),
        );
        registry.init(vec![(0, masked("##"))], &InitOptions::new().with_id("b"));

        let fields = registry.destroy("a");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].1.value(), "12");
        assert!(registry.group("a").is_none());
        assert!(registry.destroy("a").is_empty());

        assert_eq!(registry.destroy_all().len(), 1);
        assert_eq!(registry.ids().count(), 0);
    }
}
