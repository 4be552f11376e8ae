use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use pdfcrack::state::StateStore;
use pdfcrack::{
    EncData, IncrementalSource, Outcome, PasswordSource, PatternEngine, PatternSource, Permutation,
    SearchContext, SearchDriver, Which, WordlistSource,
};

#[derive(Parser, Debug)]
#[command(name = "pdfcrack", about = "Recover a PDF Standard-handler password")]
struct Args {
    /// Resume a previously saved search instead of building EncData from flags.
    #[arg(long)]
    state: Option<PathBuf>,

    #[arg(long)]
    revision: Option<u8>,
    #[arg(long, default_value_t = 1)]
    version: u8,
    #[arg(long)]
    permissions: Option<i32>,
    #[arg(long)]
    length: Option<u32>,
    #[arg(long, value_parser = parse_hex)]
    file_id: Option<Vec<u8>>,
    #[arg(long, default_value_t = true)]
    encrypt_metadata: bool,
    #[arg(long, value_parser = parse_hex)]
    o: Option<Vec<u8>>,
    #[arg(long, value_parser = parse_hex)]
    u: Option<Vec<u8>>,

    #[arg(long)]
    wordlist: Option<PathBuf>,
    #[arg(long)]
    charset: Option<String>,
    #[arg(long, default_value_t = 1)]
    min_pw: usize,
    #[arg(long, default_value_t = 8)]
    max_pw: usize,
    #[arg(long)]
    pattern: Option<String>,

    #[arg(long, value_enum, default_value_t = TargetArg::User)]
    target: TargetArg,
    #[arg(long, value_parser = parse_hex)]
    known_user_password: Option<Vec<u8>>,
    #[arg(long)]
    permutate: bool,

    #[arg(long)]
    save_state: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TargetArg {
    User,
    Owner,
}

fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("hex string must have an even number of digits".into());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let (enc, which, known_user_password, permutation, mut source) = match build_config(&args) {
        Ok(v) => v,
        Err(e) => {
            log::error!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    let mut ctx = SearchContext::new(&enc, which, permutation, known_user_password.clone());
    let outcome = SearchDriver::run(&mut ctx, &mut source);

    if let Outcome::Exhausted = outcome {
        if let Some(path) = &args.save_state {
            if let Err(e) = save_state(path, &enc, which, known_user_password.as_deref(), permutation, &source) {
                log::warn!("could not save state to {path:?}: {e}");
            }
        }
    }

    match outcome {
        Outcome::Found { password, which, recovered_user_password } => {
            let label = match which {
                Which::User => "user",
                Which::Owner => "owner",
            };
            println!("found {label}-password: {}", String::from_utf8_lossy(&password));
            if let Some(user_pw) = recovered_user_password {
                println!("found user-password: {}", String::from_utf8_lossy(&user_pw));
            }
            ExitCode::from(0)
        }
        Outcome::Exhausted => {
            println!("password not found");
            ExitCode::from(1)
        }
        Outcome::Cancelled => {
            println!("search cancelled");
            ExitCode::from(1)
        }
    }
}

type Config = (EncData, Which, Option<Vec<u8>>, Permutation, PasswordSource);

fn build_config(args: &Args) -> pdfcrack::Result<Config> {
    let permutation = if args.permutate {
        Permutation::ToggleFirstLatin1Case
    } else {
        Permutation::None
    };

    if let Some(state_path) = &args.state {
        let file = File::open(state_path)?;
        let saved = StateStore::load(BufReader::new(file), args.pattern.as_deref())?;
        return Ok((saved.enc, saved.which, saved.known_user_password, saved.permutation, saved.source));
    }

    let revision = args.revision.ok_or_else(|| {
        pdfcrack::Error::StateCorrupt("either --state or --revision (plus --o/--u/...) is required".into())
    })?;
    let enc = EncData::new(
        revision,
        1,
        args.version,
        0,
        args.permissions.unwrap_or(-1),
        args.length.unwrap_or(if revision == 5 { 256 } else { 40 }),
        args.encrypt_metadata,
        args.file_id.clone().unwrap_or_default(),
        args.o.clone().unwrap_or_default(),
        args.u.clone().unwrap_or_default(),
        "Standard".to_string(),
    )?;

    let which = match args.target {
        TargetArg::User => Which::User,
        TargetArg::Owner => Which::Owner,
    };

    let source = if let Some(pattern) = &args.pattern {
        let engine = PatternEngine::compile(pattern)?;
        PasswordSource::Pattern(PatternSource::new(engine))
    } else if let Some(path) = &args.wordlist {
        PasswordSource::Wordlist(WordlistSource::open(path)?)
    } else if let Some(charset) = &args.charset {
        PasswordSource::Incremental(IncrementalSource::new(charset.as_bytes().to_vec(), args.min_pw, args.max_pw)?)
    } else {
        return Err(pdfcrack::Error::StateCorrupt(
            "one of --pattern, --wordlist, or --charset is required".into(),
        ));
    };

    Ok((enc, which, args.known_user_password.clone(), permutation, source))
}

fn save_state(
    path: &PathBuf,
    enc: &EncData,
    which: Which,
    known_user_password: Option<&[u8]>,
    permutation: Permutation,
    source: &PasswordSource,
) -> pdfcrack::Result<()> {
    let file = File::create(path)?;
    StateStore::save(BufWriter::new(file), enc, which, known_user_password, permutation, source)
}
