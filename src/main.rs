use std::env;

use anyhow::{anyhow, Context, Result};

use frost_games::autoplay::{self, Outcome, DEFAULT_STEP_BUDGET};
use frost_games::{GameConfig, GameKind, GamesSection, Pace};

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

const USAGE: &str = "Usage: frost-games <snowman|ice-slide|match> [--seed N] [--config FILE] [--run] [--steps N] [--json]";

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let config = match &options.config {
        Some(path) => {
            GameConfig::load(path).with_context(|| format!("failed to load config {path}"))?
        }
        None => GameConfig::default(),
    };
    let mut section =
        GamesSection::new(config, options.seed).context("invalid game configuration")?;

    let outcome = match options.game {
        GameKind::Snowman => autoplay::play_snowman(&mut section, options.seed)?,
        GameKind::IceSlide => {
            let pace = if options.run { Pace::Run } else { Pace::Normal };
            autoplay::play_ice_slide(&mut section, pace, options.steps)?
        }
        GameKind::Match => autoplay::play_match(&mut section)?,
    };
    section.back();

    if options.json {
        print_json(&outcome)
    } else {
        println!("{}", outcome.summary);
        Ok(())
    }
}

fn print_json(outcome: &Outcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome).context("failed to encode outcome")?;
    println!("{json}");
    Ok(())
}

#[derive(Debug, PartialEq)]
struct CliOptions {
    game: GameKind,
    seed: u64,
    config: Option<String>,
    run: bool,
    steps: u64,
    json: bool,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let Some(game) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        let game = game
            .parse::<GameKind>()
            .map_err(|err| anyhow!("{err}. {USAGE}"))?;

        let mut options = Self {
            game,
            seed: 1,
            config: None,
            run: false,
            steps: DEFAULT_STEP_BUDGET,
            json: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--seed" => options.seed = parse_number(&mut args, "--seed")?,
                "--steps" => options.steps = parse_number(&mut args, "--steps")?,
                "--config" => {
                    options.config = Some(
                        args.next()
                            .ok_or_else(|| anyhow!("--config expects a file path"))?,
                    );
                }
                "--run" => options.run = true,
                "--json" => options.json = true,
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(options)
    }
}

fn parse_number(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<u64> {
    let value = args
        .next()
        .ok_or_else(|| anyhow!("{flag} expects a number"))?;
    value
        .parse()
        .with_context(|| format!("{flag} expects a number, got {value}"))
}
