//! # Command line interface
//!
//! ```sh
//! skos inspect thesaurus.ttl
//! skos tree thesaurus.ttl --scheme http://example.org/animals
//! skos --config skos.yaml import thesaurus.ttl
//! skos --config skos.yaml search cat --language en
//! ```
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::{
    config::{Config, StoreBackend},
    logger::{self, LogLevel},
    rdf::{write_vocabulary, SourceFormat},
    skos::{HierarchyNode, InMemorySkosRepository, Iri, SkosService, Vocabulary},
    Error, Result,
};

#[derive(Parser)]
#[command(name = "skos", version = crate::VERSION, about = "Work with SKOS vocabularies")]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    loader: LoaderArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides of the `loader` configuration section.
#[derive(Args)]
struct LoaderArgs {
    /// Preferred label language.
    #[arg(long, global = true)]
    language: Option<String>,

    /// Replace nested collections by the concepts they contain.
    #[arg(long, global = true)]
    flat: bool,

    /// Rounds of external resource resolution.
    #[arg(long, global = true)]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise an RDF document.
    Inspect { file: PathBuf },
    /// Check hierarchy integrity; fails when problems are found.
    Validate { file: PathBuf },
    /// Print the concept hierarchy of a document.
    Tree {
        file: PathBuf,
        /// Start from the top concepts of this scheme.
        #[arg(long)]
        scheme: Option<String>,
    },
    /// Rewrite a document in another RDF syntax.
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Output syntax, guessed from the output extension by default.
        #[arg(short, long, value_enum)]
        format: Option<SourceFormat>,
    },
    /// Store documents in the configured repository.
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Write everything stored in the configured repository.
    Export {
        #[arg(short, long, value_enum, default_value_t = SourceFormat::Turtle)]
        format: SourceFormat,
        /// Defaults to standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show a stored concept.
    Show {
        iri: String,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Find stored concepts by label, in the `--language` language if given.
    Search { text: String },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_yaml("")?,
    };
    if cli.verbose {
        config.logger.level = LogLevel::Debug;
    }
    if let Some(language) = &cli.loader.language {
        config.loader.language = Some(language.to_lowercase());
    }
    if cli.loader.flat {
        config.loader.flat = true;
    }
    if let Some(depth) = cli.loader.max_depth {
        config.loader.max_depth = depth;
    }
    Ok(config)
}

/// Parses the command line and runs the requested command.
///
/// # Errors
///
/// Returns the error of the failing command.
pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logger::init(&config.logger);

    match cli.command {
        Commands::Inspect { file } => inspect(&config, &file),
        Commands::Validate { file } => validate(&config, &file),
        Commands::Tree { file, scheme } => tree(&config, &file, scheme.as_deref()).await,
        Commands::Convert {
            input,
            output,
            format,
        } => convert(&config, &input, &output, format),
        Commands::Import { files } => import(&config, &files).await,
        Commands::Export { format, output } => export(&config, format, output.as_deref()).await,
        Commands::Show { iri, json } => show(&config, &Iri::new(iri)?, json).await,
        Commands::Search { text } => search(&config, &text).await,
    }
}

fn file_service(config: &Config, vocabulary: Vocabulary) -> SkosService {
    SkosService::new(
        Arc::new(InMemorySkosRepository::new(vocabulary)),
        config.loader.clone(),
    )
}

fn load(config: &Config, file: &Path) -> Result<Vocabulary> {
    crate::rdf::RdfLoader::new(config.loader.clone()).load_path(file)
}

fn inspect(config: &Config, file: &Path) -> Result<()> {
    let vocabulary = load(config, file)?;
    let summary = vocabulary.summary();
    println!("{}", file.display().to_string().bold());
    println!("  concepts:    {}", summary.concept_count);
    println!("  schemes:     {}", summary.scheme_count);
    println!("  collections: {}", summary.collection_count);

    let language = config.loader.language.as_deref();
    for scheme in vocabulary.schemes() {
        let title = scheme
            .title()
            .map_or_else(String::new, |title| format!(" {}", title.value().italic()));
        println!(
            "  {} {}{} ({} concepts)",
            "scheme".cyan(),
            scheme.id(),
            title,
            scheme.concepts().len()
        );
    }
    for collection in vocabulary.collections() {
        let kind = if collection.is_ordered() {
            "ordered collection"
        } else {
            "collection"
        };
        println!(
            "  {} {} ({} members)",
            kind.cyan(),
            collection.id(),
            collection.members().len()
        );
    }
    let roots = vocabulary.roots();
    let shown: Vec<String> = roots
        .iter()
        .take(10)
        .map(|root| {
            vocabulary
                .concept(root)
                .and_then(|concept| concept.pref_label(language))
                .map_or_else(|| root.to_string(), |label| label.value().to_owned())
        })
        .collect();
    println!("  roots ({}): {}", roots.len(), shown.join(", "));
    Ok(())
}

fn validate(config: &Config, file: &Path) -> Result<()> {
    let vocabulary = load(config, file)?;
    let violations = vocabulary.validate();
    if violations.is_empty() {
        println!("{} {}", "ok".green().bold(), file.display());
        return Ok(());
    }
    for violation in &violations {
        println!("{} {violation}", "error".red().bold());
    }
    Err(Error::Message(format!(
        "{} integrity problem(s) in {}",
        violations.len(),
        file.display()
    )))
}

fn print_node(node: &HierarchyNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match &node.label {
        Some(label) => println!("{indent}{} {}", label.bold(), node.concept.to_string().dimmed()),
        None => println!("{indent}{}", node.concept),
    }
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

async fn tree(config: &Config, file: &Path, scheme: Option<&str>) -> Result<()> {
    let service = file_service(config, load(config, file)?);
    let scheme = scheme.map(Iri::new).transpose()?;
    for node in service.hierarchy(scheme.as_ref()).await? {
        print_node(&node, 0);
    }
    Ok(())
}

fn convert(config: &Config, input: &Path, output: &Path, format: Option<SourceFormat>) -> Result<()> {
    let format = match format {
        Some(format) => format,
        None => SourceFormat::from_path(output)?,
    };
    let vocabulary = load(config, input)?;
    let file = File::create(output).map_err(|source| Error::Io {
        path: output.to_path_buf(),
        source,
    })?;
    let mut writer = write_vocabulary(&vocabulary, BufWriter::new(file), format)?;
    writer.flush()?;
    println!("{} {} -> {}", "converted".green(), input.display(), output.display());
    Ok(())
}

async fn import(config: &Config, files: &[PathBuf]) -> Result<()> {
    if config.store.backend == StoreBackend::InMemory {
        tracing::warn!("in-memory store selected: imported data is dropped on exit");
    }
    let service = SkosService::from_config(config).await?;
    for file in files {
        let summary = service.import_path(file).await?;
        println!(
            "{} {}: {} concepts, {} schemes, {} collections",
            "imported".green(),
            file.display(),
            summary.concept_count,
            summary.scheme_count,
            summary.collection_count
        );
    }
    Ok(())
}

async fn export(config: &Config, format: SourceFormat, output: Option<&Path>) -> Result<()> {
    let service = SkosService::from_config(config).await?;
    match output {
        Some(path) => {
            let file = File::create(path).map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let mut writer = service.export(BufWriter::new(file), format).await?;
            writer.flush()?;
        }
        None => {
            let mut writer = service.export(io::stdout().lock(), format).await?;
            writer.flush()?;
        }
    }
    Ok(())
}

async fn show(config: &Config, iri: &Iri, json: bool) -> Result<()> {
    let service = SkosService::from_config(config).await?;
    let snapshot = service.concept(iri).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let concept = &snapshot.concept;
    let language = config.loader.language.as_deref();
    let title = concept
        .pref_label(language)
        .map_or_else(|| concept.id().to_string(), |label| label.value().to_owned());
    println!("{} {}", title.bold(), concept.id().to_string().dimmed());
    if let Some(notation) = concept.notation() {
        println!("  notation:   {notation}");
    }
    if let Some(definition) = concept.definition() {
        println!("  definition: {definition}");
    }
    for kind in crate::skos::LabelKind::ALL {
        let labels: Vec<String> = concept.labels(kind).map(ToString::to_string).collect();
        if !labels.is_empty() {
            println!("  {:<10}  {}", format!("{}Label", kind.name()), labels.join(", "));
        }
    }
    for relation in crate::skos::SemanticRelation::ALL {
        for target in concept.relations(relation) {
            println!("  {:<10}  {target}", relation.name().cyan());
        }
    }
    for relation in crate::skos::MappingRelation::ALL {
        for target in concept.mappings(relation) {
            println!("  {:<10}  {target}", relation.name().yellow());
        }
    }
    for scheme in &snapshot.schemes {
        println!("  {:<10}  {scheme}", "inScheme");
    }
    for collection in &snapshot.collections {
        println!("  {:<10}  {collection}", "member of");
    }
    Ok(())
}

async fn search(config: &Config, text: &str) -> Result<()> {
    let service = SkosService::from_config(config).await?;
    let found = service
        .repository()
        .search(text, config.loader.language.as_deref())
        .await?;
    if found.is_empty() {
        println!("{}", "no match".yellow());
    }
    for iri in found {
        println!("{iri}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{load_config, Cli, Commands};

    #[test]
    fn loader_flags_override_configuration() {
        let cli = Cli::parse_from([
            "skos",
            "--language",
            "FR",
            "--flat",
            "inspect",
            "thesaurus.ttl",
        ]);
        assert!(matches!(cli.command, Commands::Inspect { .. }));
        let config = load_config(&cli).expect("config");
        assert_eq!(config.loader.language.as_deref(), Some("fr"));
        assert!(config.loader.flat);
        assert_eq!(config.loader.max_depth, 0);
    }

    #[test]
    fn export_defaults_to_turtle() {
        let cli = Cli::parse_from(["skos", "export"]);
        let Commands::Export { format, output } = cli.command else {
            panic!("export command expected");
        };
        assert_eq!(format, crate::rdf::SourceFormat::Turtle);
        assert!(output.is_none());
    }
}
