use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pf_civic::{
    AddressResolver, ApiKey, Client, EndpointConfig, NominatimGeocoder, PollingLocation,
    Selection, Session, VoterInfoError, VoterInfoQuery,
};
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Find polling locations for an address")]
struct CliArgs {
    #[command(subcommand)]
    pub subcommand: Command,

    #[command(flatten)]
    pub global_opts: GlobalOpts,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    #[arg(
        short = 'k',
        long,
        env = "CIVIC_API_KEY",
        hide_env_values = true,
        global = true,
        help = "Civic Information API key"
    )]
    pub api_key: Option<String>,

    #[arg(
        long,
        env = "CIVIC_VOTER_INFO_ENDPOINT",
        global = true,
        help = "Voter info endpoint. Defaults to the Google Civic Information API."
    )]
    pub voter_info_endpoint: Option<String>,

    #[arg(
        long,
        env = "POLLFINDER_GEOCODER_ENDPOINT",
        global = true,
        help = "Nominatim base URL. Defaults to the public OpenStreetMap instance."
    )]
    pub geocoder_endpoint: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    #[clap(name = "voter-info", about = "Query voter info for an address")]
    VoterInfo {
        address: String,

        #[arg(short = 'e', long, help = "Election to query. Defaults to the upcoming election.")]
        election_id: Option<String>,

        #[arg(long, help = "Only return data from official state sources")]
        official_only: bool,

        #[arg(long = "all-data", help = "Return all available data for the address")]
        return_all_available_data: bool,

        #[arg(short = 'o', long, help = "Output file")]
        output_path: Option<String>,
    },

    #[clap(name = "resolve", about = "Resolve a place to a mailing address")]
    Resolve {
        #[command(flatten)]
        selection: SelectionOpts,
    },

    #[clap(name = "lookup", about = "Resolve a place and list its polling locations")]
    Lookup {
        #[command(flatten)]
        selection: SelectionOpts,

        #[arg(long, help = "Print polling locations as JSON")]
        json: bool,
    },
}

#[derive(Args, Debug, PartialEq)]
struct SelectionOpts {
    #[arg(short = 't', long, help = "Place title, e.g. a street address")]
    pub title: String,

    #[arg(short = 's', long, default_value = "", help = "Place subtitle, e.g. city and state")]
    pub subtitle: String,
}

impl From<SelectionOpts> for Selection {
    fn from(opts: SelectionOpts) -> Self {
        Selection::new(opts.title, opts.subtitle)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let http = pf_civic::default_http_client().context("Failed to build HTTP client")?;

    match args.subcommand {
        Command::VoterInfo {
            address,
            election_id,
            official_only,
            return_all_available_data,
            output_path,
        } => {
            let client = voter_info_client(&http, &args.global_opts)?;
            let mut builder = VoterInfoQuery::builder();
            builder
                .address(address)
                .official_only(official_only)
                .return_all_available_data(return_all_available_data);
            if let Some(election_id) = election_id {
                builder.election_id(election_id);
            }
            let query = builder.build().map_err(VoterInfoError::from)?;
            let response = client.query_voter_info(&query).await?;
            let json_output = serde_json::to_string_pretty(&response)?;
            if let Some(output_path) = output_path {
                std::fs::write(&output_path, json_output)
                    .with_context(|| format!("Failed to write {output_path}"))?;
            } else {
                println!("{}", json_output);
            }
        }
        Command::Resolve { selection } => {
            let geocoder = geocoder(&http, &args.global_opts)?;
            let resolver = AddressResolver::new(geocoder.clone(), geocoder);
            let address = resolver.resolve(&selection.into()).await?;
            println!("{}", address);
        }
        Command::Lookup { selection, json } => {
            let client = voter_info_client(&http, &args.global_opts)?;
            let geocoder = geocoder(&http, &args.global_opts)?;
            let session = Session::new(AddressResolver::new(geocoder.clone(), geocoder), client);
            let selection = Selection::from(selection);

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
            let progress = spinner.clone();
            let mut views = WatchStream::new(session.subscribe());
            let watcher = tokio::spawn(async move {
                while let Some(view) = views.next().await {
                    if view.is_refreshing {
                        progress.set_message(format!("Looking up {}", view.address));
                        progress.enable_steady_tick(Duration::from_millis(100));
                    } else {
                        progress.disable_steady_tick();
                    }
                }
            });

            let result = session.select(&selection).await;
            watcher.abort();
            spinner.finish_and_clear();
            let view = session.view();
            debug!(address = %view.address, "Lookup finished");

            if let Err(error) = result {
                let retryable = view.alert.as_ref().is_some_and(|alert| alert.retryable);
                let hint = if retryable { ", try again shortly" } else { "" };
                return Err(anyhow::Error::new(error).context(format!("Lookup failed{hint}")));
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&view.polling_locations)?);
            } else if view.polling_locations.is_empty() {
                println!("No polling locations published for this address yet.");
            } else {
                for location in &view.polling_locations {
                    print_location(location);
                }
            }
        }
    }

    Ok(())
}

fn voter_info_client(http: &reqwest::Client, opts: &GlobalOpts) -> Result<Client> {
    let api_key = match opts.api_key.as_deref() {
        Some(key) => ApiKey::from_raw(key)?,
        None => ApiKey::from_env()?,
    };
    let endpoints = EndpointConfig {
        voter_info: opts.voter_info_endpoint.clone(),
    };
    Ok(Client::new(http.clone(), Some(endpoints), api_key)?)
}

fn geocoder(http: &reqwest::Client, opts: &GlobalOpts) -> Result<NominatimGeocoder> {
    Ok(NominatimGeocoder::new(
        http.clone(),
        opts.geocoder_endpoint.as_deref(),
    )?)
}

fn print_location(location: &PollingLocation) {
    let address = &location.address;
    if !address.location_name.is_empty() {
        println!("{}", address.location_name);
    }
    println!("{}", address.line1);
    println!("{}, {}", address.city, address.state);
    println!("{}", address.zip);
    if !location.polling_hours.is_empty() {
        println!("Hours: {}", location.polling_hours);
    }
    if !location.notes.is_empty() {
        println!("{}", location.notes);
    }
    println!();
}
