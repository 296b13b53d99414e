//! Compatibility test suite
//!
//! Field-level behavior: text is written into a field the way a browser
//! input would receive it, then the session is told about the edit.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use inmask::{
    BufferField, CharMatcher, InitOptions, MaskOptions, MaskRegistry, MaskSession, OptionsPatch,
    PatternRule, Preset, TextSurface, Transform, create_mask,
};

/// Replace the field text and report it as user input
fn enter(session: &mut MaskSession<BufferField>, text: &str) {
    let field = session.surface_mut().expect("session is mounted");
    field.set_text(text);
    let caret = text.chars().count();
    field.set_cursor(caret);
    session.input(caret);
}

fn field_text(session: &MaskSession<BufferField>) -> &str {
    session.surface().expect("session is mounted").value()
}

fn mounted(options: MaskOptions) -> MaskSession<BufferField> {
    let mut session = create_mask(options);
    session.mount(BufferField::new());
    session
}

mod mask_creation {
    use super::*;

    #[test]
    fn test_basic_mask() {
        let mut session = mounted(MaskOptions::new("##/##/####").with_placeholder('_'));
        enter(&mut session, "12345678");
        assert_eq!(field_text(&session), "12/34/5678");
    }

    #[test]
    fn test_validate_input() {
        let mut session = mounted(MaskOptions::new("###").with_validator(|v| v.len() == 3));
        enter(&mut session, "12");
        assert!(!session.validate().is_valid);

        enter(&mut session, "123");
        assert!(session.validate().is_valid);
    }

    #[test]
    fn test_keep_literals() {
        let mut session = mounted(MaskOptions::new("##/##").with_keep_literals(true));
        enter(&mut session, "1234");
        assert_eq!(field_text(&session), "12/34");
    }

    #[test]
    fn test_set_and_get_values() {
        let mut session = mounted(MaskOptions::new("####-####"));
        session.set_value("12345678");
        assert_eq!(field_text(&session), "1234-5678");
        assert_eq!(session.value(), "12345678");
    }

    #[test]
    fn test_optional_sections() {
        let mut session = mounted(MaskOptions::new("##[/##]").with_optional_sections(true));
        enter(&mut session, "12");
        assert_eq!(field_text(&session), "12");

        enter(&mut session, "1234");
        assert_eq!(field_text(&session), "12/34");
    }

    #[test]
    fn test_destroy() {
        let mut session = mounted(MaskOptions::new("##/##/####"));
        session.destroy();
        assert_eq!(session.value(), "");
        assert!(!session.is_mounted());
    }

    #[test]
    fn test_format_description() {
        let mut session = mounted(MaskOptions::new("##/##").with_announce_changes(true));
        let focus = session.focus();
        assert_eq!(
            focus.announcement.unwrap().message(),
            "Format: number number / number number"
        );
    }
}

mod custom_patterns {
    use super::*;

    #[test]
    fn test_mixed_pattern_types() {
        let mut session = mounted(MaskOptions::new("U##L"));
        enter(&mut session, "a12B");
        assert_eq!(field_text(&session), "A12b");
    }

    #[test]
    fn test_update_options_after_mount() {
        let upper = || PatternRule::from_regex("[A-Z]").unwrap();
        let mut session = mounted(MaskOptions::new("AAA").with_pattern('A', upper()));
        enter(&mut session, "ABC");
        assert_eq!(field_text(&session), "ABC");

        session.update_options(
            OptionsPatch::new().pattern('A', upper().with_transform(Transform::Lowercase)),
        );
        assert_eq!(field_text(&session), "abc");

        enter(&mut session, "ABC");
        assert_eq!(field_text(&session), "abc");
    }

    #[test]
    fn test_predicate_rule() {
        let vowel = PatternRule::predicate(|c| "aeiou".contains(c));
        let mut session = mounted(MaskOptions::new("VV-##").with_pattern('V', vowel));
        enter(&mut session, "ae12");
        assert_eq!(field_text(&session), "ae-12");
        enter(&mut session, "xe12");
        assert_eq!(field_text(&session), "_e-12");
    }

    #[test]
    fn test_replacing_builtin_rule() {
        let hex = PatternRule::new(CharMatcher::Alphanumeric).with_transform(Transform::Uppercase);
        let mut session = mounted(MaskOptions::new("##:##").with_pattern('#', hex));
        enter(&mut session, "a0ff");
        assert_eq!(field_text(&session), "A0:FF");
    }
}

mod date_formats {
    use super::*;

    fn date(patch: OptionsPatch) -> MaskSession<BufferField> {
        let mut session = Preset::Date.create(patch);
        session.mount(BufferField::new());
        session
    }

    #[test]
    fn test_default_mask() {
        let mut session = date(OptionsPatch::new());
        enter(&mut session, "12312023");
        assert_eq!(field_text(&session), "12/31/2023");
        assert!(session.validate().is_valid);
    }

    #[test]
    fn test_year_month_day() {
        let mut session = date(OptionsPatch::new().mask("YYYY-MM-DD"));
        enter(&mut session, "20231231");
        assert_eq!(field_text(&session), "2023-12-31");
    }

    #[test]
    fn test_day_month_year() {
        let mut session = date(OptionsPatch::new().mask("DD.MM.YYYY"));
        enter(&mut session, "31122023");
        assert_eq!(field_text(&session), "31.12.2023");
    }

    #[test]
    fn test_invalid_date() {
        let mut session = date(OptionsPatch::new());
        enter(&mut session, "13312023");
        let validation = session.validate();
        assert!(!validation.is_valid);
        assert_eq!(validation.error_message.as_deref(), Some("Invalid input"));
    }
}

mod edge_cases {
    use super::*;

    #[test]
    fn test_empty_input() {
        let mut session = mounted(MaskOptions::new("###-###"));
        enter(&mut session, "");
        assert_eq!(field_text(&session), "");
    }

    #[test]
    fn test_input_too_long() {
        let mut session = mounted(MaskOptions::new("###"));
        enter(&mut session, "12345");
        assert_eq!(field_text(&session), "123");
    }

    #[test]
    fn test_non_matching_characters_leave_placeholders() {
        let mut session = mounted(MaskOptions::new("###"));
        enter(&mut session, "abc");
        assert_eq!(field_text(&session), "___");
        assert_eq!(session.value(), "");
    }

    #[test]
    fn test_unmount_and_remount() {
        let mut session = mounted(MaskOptions::new("###-###"));
        enter(&mut session, "123456");
        assert_eq!(field_text(&session), "123-456");

        let mut field = session.unmount().unwrap();
        field.set_text("123456");
        assert!(session.input(6).is_none());
        assert_eq!(field.value(), "123456");

        session.mount(field);
        enter(&mut session, "654321");
        assert_eq!(field_text(&session), "654-321");
    }

    #[test]
    fn test_literal_only_mask() {
        let mut session = mounted(MaskOptions::new("---"));
        enter(&mut session, "abc");
        assert_eq!(field_text(&session), "---");
        assert_eq!(session.value(), "");
    }

    #[test]
    fn test_repeated_pattern_characters() {
        let mut session = mounted(MaskOptions::new("A#A#A#"));
        enter(&mut session, "a1b2c3");
        assert_eq!(field_text(&session), "a1b2c3");
    }

    #[test]
    fn test_repeated_pattern_characters_with_transforms() {
        let mut session = mounted(MaskOptions::new("U#U#L#"));
        enter(&mut session, "a1b2c3");
        assert_eq!(field_text(&session), "A1B2c3");
    }

    #[test]
    fn test_validation_function_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut session = mounted(MaskOptions::new("######").with_validator(move |value| {
            counter.fetch_add(1, Ordering::SeqCst);
            value.len() >= 5
        }));

        enter(&mut session, "1234");
        assert!(!session.validate().is_valid);
        enter(&mut session, "12345");
        assert!(session.validate().is_valid);
        assert!(calls.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_invalid_inline_regex_stays_literal() {
        let mut session = mounted(MaskOptions::new("#{[}#").with_regex_patterns(true));
        assert_eq!(session.masker().spec().effective_pattern(), "#{[}#");
        assert_eq!(session.masker().spec().diagnostics().len(), 1);
        enter(&mut session, "12");
        assert_eq!(field_text(&session), "1{[}2");
    }
}

mod presets {
    use super::*;

    #[test]
    fn test_phone() {
        let mut session = Preset::Phone.create(OptionsPatch::new());
        session.mount(BufferField::new());
        enter(&mut session, "5551234567");
        assert_eq!(field_text(&session), "(555) 123-4567");
    }

    #[test]
    fn test_card_time_ip() {
        for (preset, input, expected) in [
            (Preset::Card, "1234567812345678", "1234 5678 1234 5678"),
            (Preset::Time, "0945", "09:45"),
            (Preset::Ip, "127000000001", "127.000.000.001"),
        ] {
            let mut session = preset.create(OptionsPatch::new());
            session.mount(BufferField::new());
            enter(&mut session, input);
            assert_eq!(field_text(&session), expected, "preset {}", preset);
        }
    }
}

mod auto_init {
    use super::*;

    #[test]
    fn test_init_from_attributes() {
        let mut registry = MaskRegistry::new();
        let result = registry.init(
            vec![
                ("phone", BufferField::new().with_attribute("data-mask", "(###) ###-####")),
                (
                    "date",
                    BufferField::new()
                        .with_attribute("data-mask", "##/##/####")
                        .with_attribute("data-mask-placeholder", "-"),
                ),
                ("name", BufferField::new()),
            ],
            &InitOptions::new(),
        );
        assert_eq!(result.count, 2);

        let group = registry.group_mut(&result.id).unwrap();
        let date = group.get_mut(&"date").unwrap();
        assert_eq!(date.options().placeholder, '-');
        enter(date, "12a");
        assert_eq!(field_text(date), "12/-");

        let fields = registry.destroy_all();
        assert_eq!(fields.len(), 2);
    }
}
