use clap::{Parser, Subcommand};
use medex_core::{
    config::data_dir_from_env_value, tools, CoreConfig, Diagnosis, DiseaseName, DiseaseRule,
    MedexService, NonEmptyText, PatientId, SymptomKey, SymptomReport,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "medex")]
#[command(about = "medex diagnosis knowledge base CLI")]
struct Cli {
    /// Data directory (defaults to MEDEX_DATA_DIR, then ./data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every known symptom
    Symptoms,
    /// Diagnose from symptom answers
    Diagnose {
        /// Answers as symptom=yes|no
        #[arg(required = true)]
        answers: Vec<String>,
    },
    /// Suggest the next questions to ask
    Questions {
        /// Answers already given, as symptom=yes|no
        answers: Vec<String>,
    },
    /// Add a rule for a new disease
    AddRule {
        /// Disease name
        disease: String,
        /// Expected answers as symptom=yes|no
        #[arg(required = true)]
        answers: Vec<String>,
    },
    /// Register a symptom with its question text
    AddSymptom {
        /// Symptom key
        symptom: String,
        /// Question asked to the patient
        question: String,
    },
    /// Show description and treatment of a disease
    Explain {
        /// Disease name
        disease: String,
    },
    /// Store description and treatment texts of a disease
    Document {
        /// Disease name
        disease: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        treatment: String,
    },
    /// Print a patient's interaction history
    History {
        /// Patient identifier
        patient_id: String,
    },
    /// Append an interaction (a JSON object) to a patient's history
    Record {
        /// Patient identifier
        patient_id: String,
        /// Interaction as a JSON object
        interaction: String,
    },
    /// Print the agent tool declarations as JSON
    Tools,
}

/// Splits `symptom=answer` arguments.
fn parse_answers(args: &[String]) -> Result<Vec<(String, String)>, String> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| format!("expected symptom=yes|no, got '{arg}'"))
        })
        .collect()
}

fn report_from(args: &[String]) -> Result<SymptomReport, Box<dyn std::error::Error>> {
    Ok(SymptomReport::from_raw(parse_answers(args)?)?)
}

fn rule_from(args: &[String]) -> Result<DiseaseRule, Box<dyn std::error::Error>> {
    Ok(DiseaseRule::try_from(
        parse_answers(args)?.into_iter().collect::<std::collections::BTreeMap<_, _>>(),
    )?)
}

fn run(service: &MedexService, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Symptoms => {
            let symptoms = service.list_symptoms()?;
            if symptoms.is_empty() {
                println!("No symptoms found.");
            }
            for symptom in symptoms {
                println!("{symptom}");
            }
        }
        Commands::Diagnose { answers } => match service.diagnose(&report_from(&answers)?)? {
            Diagnosis::Confident {
                disease,
                score,
                description,
                treatment,
            } => {
                println!("Diagnosis: {disease} (score {score})");
                println!("Description: {description}");
                println!("Treatment: {treatment}");
            }
            Diagnosis::NoConfidentMatch { message } => println!("{message}"),
        },
        Commands::Questions { answers } => {
            for question in service.suggest_questions(&report_from(&answers)?)? {
                println!("{question}");
            }
        }
        Commands::AddRule { disease, answers } => {
            let added = service.add_rule(DiseaseName::new(&disease)?, rule_from(&answers)?)?;
            println!("New disease '{}' added successfully.", added.disease);
            if !added.introduced.is_empty() {
                let introduced: Vec<String> =
                    added.introduced.iter().map(ToString::to_string).collect();
                println!("New symptoms: {}", introduced.join(", "));
            }
        }
        Commands::AddSymptom { symptom, question } => {
            let key = SymptomKey::new(&symptom)?;
            service.add_symptom(key.clone(), &NonEmptyText::new(&question)?)?;
            println!("Added symptom: {key}");
        }
        Commands::Explain { disease } => {
            let explanation = service.explain_disease(&DiseaseName::new(&disease)?)?;
            println!("{}", explanation.disease);
            println!("Description: {}", explanation.description);
            println!("Treatment: {}", explanation.treatment);
        }
        Commands::Document {
            disease,
            description,
            treatment,
        } => {
            let disease = DiseaseName::new(&disease)?;
            service.document_disease(
                &disease,
                &NonEmptyText::new(&description)?,
                &NonEmptyText::new(&treatment)?,
            )?;
            println!("Stored documents for: {disease}");
        }
        Commands::History { patient_id } => {
            let history = service.patient_history(&PatientId::new(&patient_id)?)?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Commands::Record {
            patient_id,
            interaction,
        } => {
            let Value::Object(payload) = serde_json::from_str::<Value>(&interaction)? else {
                return Err("interaction must be a JSON object".into());
            };
            let patient = PatientId::new(&patient_id)?;
            let record = service.append_interaction(&patient, payload)?;
            println!("Interaction saved for {patient} at {}", record.timestamp);
        }
        Commands::Tools => {
            println!(
                "{}",
                serde_json::to_string_pretty(&tools::declarations())?
            );
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'medex --help' for commands");
        return Ok(());
    };

    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| data_dir_from_env_value(std::env::var("MEDEX_DATA_DIR").ok()));
    let service = MedexService::open(Arc::new(CoreConfig::new(data_dir)?))?;

    if let Err(e) = run(&service, command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
