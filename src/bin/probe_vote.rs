use anyhow::Context;
use clap::Parser;
use election_sim::core::comparison::load_historical;
use election_sim::core::parser::try_parse_vote;
use election_sim::core::prompt::BallotTemplate;
use election_sim::core::provider::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
use election_sim::core::CompletionProvider;
use election_sim::domain::profile::{EducationLevel, Gender, IncomeLevel, MaritalStatus, VoterProfile};
use election_sim::domain::state::UsState;
use election_sim::utils::logger;
use election_sim::{OpenAiProvider, ProviderSettings};

/// Sends one prompt for one voter and prints what came back.
#[derive(Parser)]
#[command(name = "probe-vote")]
#[command(about = "Debug a single prediction: show the prompt, the raw reply and the parsed vote")]
struct Args {
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, default_value = DEFAULT_API_KEY_ENV)]
    api_key_env: String,

    #[arg(long, default_value = "35")]
    age: u32,

    #[arg(long, default_value = "female")]
    gender: Gender,

    #[arg(long, default_value = "Florida")]
    state: UsState,

    #[arg(long, default_value = "bachelor")]
    education: EducationLevel,

    #[arg(long, default_value = "married")]
    marital_status: MaritalStatus,

    #[arg(long, default_value = "teacher")]
    occupation: String,

    #[arg(long, default_value = "5")]
    income_level: IncomeLevel,

    /// Historical results CSV supplying the state's political leaning
    #[arg(long)]
    historical: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let profile = VoterProfile {
        age: args.age,
        gender: args.gender,
        state: args.state,
        education: args.education,
        marital_status: args.marital_status,
        occupation: args.occupation.clone(),
        income_level: args.income_level,
    };

    let historical = args
        .historical
        .as_deref()
        .map(load_historical)
        .transpose()
        .context("loading historical results")?;
    let leaning = historical.as_ref().and_then(|h| h.block(profile.state));

    let prompt = BallotTemplate::default().render(&profile, leaning);
    println!("--- Generated Prompt ---");
    println!("{}", prompt);
    println!("------------------------");

    let mut settings = ProviderSettings::from_env(&args.api_key_env)
        .with_context(|| format!("reading API key from {}", args.api_key_env))?;
    settings.base_url = args.base_url.clone();
    let provider = OpenAiProvider::new(&settings).context("building provider client")?;

    println!("Requesting vote from {} ...", provider.endpoint());
    let reply = provider
        .complete(&prompt, &args.model)
        .await
        .context("prediction request failed")?;

    println!("--- Model's Raw Response ---");
    println!("{}", reply);
    println!("----------------------------");
    match try_parse_vote(&reply) {
        Ok(party) => println!("Parsed vote: {}", party),
        Err(e) => println!("Parsed vote: Unknown ({})", e),
    }
    Ok(())
}
