use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use miette::Result;
use protodoc::{FileBundle, Importer};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
pub struct Args {
    /// The root file(s) to document
    #[clap(value_name = "PROTO_FILES", required = true, value_parser)]
    files: Vec<PathBuf>,
    /// The directory against which imports are resolved.
    #[clap(
        short = 'I',
        long = "import-root",
        value_name = "PATH",
        default_value = ".",
        value_parser
    )]
    import_root: PathBuf,
    /// A pattern for links to source files, in which `{path}` is replaced by the file name.
    #[clap(long, value_name = "PATTERN")]
    source_url_pattern: Option<String>,
    /// How to print the collected declarations.
    #[clap(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Every included declaration, grouped by file.
    Text,
    /// The number of files and declarations.
    Summary,
}

pub fn main() -> Result<()> {
    miette::set_panic_hook();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut importer = Importer::new(args.import_root);
    importer.source_url_pattern(args.source_url_pattern);
    for file in args.files {
        importer.add_root_file(file)?;
    }

    let bundle = importer.into_bundle();
    match args.format {
        Format::Text => print_text(&bundle),
        Format::Summary => print_summary(&bundle),
    }
    Ok(())
}

fn print_text(bundle: &FileBundle) {
    for file in bundle.files() {
        let messages: Vec<_> = bundle
            .all_messages()
            .filter(|(owner, _)| owner.name() == file.name())
            .map(|(_, message)| message)
            .collect();
        let enums: Vec<_> = bundle
            .all_enum_defs()
            .filter(|(owner, _)| owner.name() == file.name())
            .map(|(_, enum_def)| enum_def)
            .collect();
        let services: Vec<_> = bundle
            .all_services()
            .filter(|(owner, _)| owner.name() == file.name())
            .map(|(_, service)| service)
            .collect();

        if messages.is_empty() && enums.is_empty() && services.is_empty() {
            continue;
        }

        match bundle.source_url(file) {
            Some(url) => println!("{} ({})", file.name(), url),
            None => println!("{}", file.name()),
        }
        for message in messages {
            println!("  message {}", message.qualified_name(file));
        }
        for enum_def in enums {
            println!("  enum {}", enum_def.qualified_name(file));
        }
        for service in services {
            println!("  service {}", service.qualified_name(file));
            for rpc in &service.rpcs {
                println!(
                    "    rpc {}({}{}) returns ({}{})",
                    rpc.name,
                    if rpc.input_stream { "stream " } else { "" },
                    rpc.input,
                    if rpc.output_stream { "stream " } else { "" },
                    rpc.output,
                );
            }
        }
    }
}

fn print_summary(bundle: &FileBundle) {
    println!("files: {}", bundle.file_count());
    println!("messages: {}", bundle.all_messages().count());
    println!("enums: {}", bundle.all_enum_defs().count());
    println!("services: {}", bundle.all_services().count());
}
