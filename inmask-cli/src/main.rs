use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use inmask::{
    BufferField, CompileOptions, Keystrokes, MaskOptions, Masker, OptionsPatch, Preset,
    ValidationResult, compile, compile_debug, create_mask,
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "inmask")]
#[command(about = "Inmask - Input masking for text fields")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    mask: MaskFlags,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct MaskFlags {
    /// Character written into rejected slots
    #[arg(long, default_value_t = '_', global = true)]
    placeholder: char,
    /// Parse [...] as optional sections
    #[arg(long, global = true)]
    optional: bool,
    /// Expand #{...} as inline regex sections
    #[arg(long, global = true)]
    regex: bool,
}

impl MaskFlags {
    fn options(&self, mask: &str) -> MaskOptions {
        MaskOptions::new(mask)
            .with_placeholder(self.placeholder)
            .with_optional_sections(self.optional)
            .with_regex_patterns(self.regex)
    }

    fn patch(&self) -> OptionsPatch {
        OptionsPatch::new()
            .placeholder(self.placeholder)
            .optional_sections(self.optional)
            .regex_patterns(self.regex)
    }

    fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            optional_sections: self.optional,
            regex_sections: self.regex,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a mask to input
    Apply {
        /// The mask pattern
        mask: String,
        /// The input text
        input: String,
    },
    /// Extract the raw value from a masked value
    Raw {
        /// The mask pattern
        mask: String,
        /// The masked value
        masked: String,
    },
    /// Show the effective pattern of a mask
    Compile {
        /// The mask pattern
        mask: String,
        /// Show sections, inline patterns and diagnostics
        #[arg(short, long)]
        debug: bool,
    },
    /// Simulate typing into a masked field ('<' is backspace)
    Type {
        /// The mask pattern
        mask: String,
        /// The keys to press
        keys: String,
    },
    /// Apply a preset mask (date, phone, card, time, ip)
    Preset {
        /// The preset name
        name: String,
        /// The input text
        input: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Apply { mask, input } => cmd_apply(&cli.mask.options(mask), input),
        Commands::Raw { mask, masked } => cmd_raw(&cli.mask.options(mask), masked),
        Commands::Compile { mask, debug } => cmd_compile(mask, cli.mask.compile_options(), *debug),
        Commands::Type { mask, keys } => cmd_type(cli.mask.options(mask), keys),
        Commands::Preset { name, input } => cmd_preset(name, cli.mask.patch(), input),
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let level = level.as_str().to_lowercase();
    // Other crates stay at warn.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,inmask_core={level},inmask={level},inmask_cli={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn cmd_apply(options: &MaskOptions, input: &str) {
    println!("{}", "Applying mask...".bold());
    println!("  Mask:  {}", options.mask.cyan());
    println!("  Input: {}", input.yellow());
    println!();

    let masker = Masker::from_options(options);
    warn_diagnostics(&masker);
    let formatted = masker.format(input);
    let validation = masker.validate_formatted(&formatted, None);

    println!("  Masked: {}", formatted.masked.green());
    println!("  Raw:    {}", formatted.raw.green());
    if !formatted.active_sections().is_empty() {
        println!("  Active sections: {:?}", formatted.active_sections());
    }
    print_validation(&validation);
}

fn cmd_raw(options: &MaskOptions, masked: &str) {
    let masker = Masker::from_options(options);
    warn_diagnostics(&masker);
    println!("{}", masker.extract_raw(masked).green());
}

fn cmd_compile(mask: &str, options: CompileOptions, debug: bool) {
    println!("{}", "Compiling mask...".bold());
    println!("  Input:  {}", mask.cyan());
    println!();

    if debug {
        compile_debug(mask, options).report();
    } else {
        let spec = compile(mask, options);
        println!("{}", "Effective pattern:".bold());
        println!("  {}", spec.effective_pattern().green());
    }
}

fn cmd_type(options: MaskOptions, keys: &str) {
    let mut session = create_mask(options);
    session.mount(BufferField::new());
    warn_diagnostics(session.masker());

    for key in keys.chars() {
        if key == '<' {
            session.press_backspace();
        } else {
            session.type_char(key);
        }
        let Some(field) = session.surface() else {
            break;
        };
        println!(
            "  {} {}",
            format!("[{}]", key).dimmed(),
            with_caret(field.value(), field.cursor())
        );
    }

    println!();
    println!("  Masked: {}", session.masked_value().green());
    println!("  Raw:    {}", session.value().green());
    print_validation(&session.validate());
}

fn cmd_preset(name: &str, patch: OptionsPatch, input: &str) {
    let preset: Preset = match name.parse() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let options = preset.options_with(patch);
    println!("{} {}", "Preset".bold(), preset.to_string().cyan());
    cmd_apply(&options, input);
}

fn warn_diagnostics(masker: &Masker) {
    for diagnostic in masker.spec().diagnostics() {
        eprintln!("{} {}", "Warning:".yellow().bold(), diagnostic);
    }
}

fn print_validation(validation: &ValidationResult) {
    match &validation.error_message {
        None => println!("  {}", "✓ Valid".green().bold()),
        Some(message) => println!("  {} {}", "✗".red().bold(), message.red()),
    }
}

fn with_caret(text: &str, caret: usize) -> String {
    let mut out: String = text.chars().take(caret).collect();
    out.push('|');
    out.extend(text.chars().skip(caret));
    out
}
