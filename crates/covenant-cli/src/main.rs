//! Demo entry point: runs the Covenant engine against a couple of
//! hand-written `ContractFn`s and prints whatever `AnalysisMessage`s come
//! back as a flat listing. Contract-expression parsing and entity discovery
//! are out of scope (`spec.md` §1) — a real front end would replace
//! `demo_functions` with compiled conditions from an actual source file.

mod demo;

use clap::Parser;
use covenant_core::{MessageKind, Options, VerificationStatus};
use covenant_engine::{CallDriver, ClassRegistry};

#[derive(Parser)]
#[command(name = "covenant", about = "Contract-directed symbolic execution, demo driver")]
struct Args {
    /// Emit confirmation messages in addition to failures.
    #[arg(long)]
    report_all: bool,

    /// Name of the demo function to analyze; omit to run all of them.
    name: Option<String>,
}

fn main() {
    let args = Args::parse();
    let mut options = Options::default();
    options.report_all = args.report_all;

    let demos = demo::all();
    let selected: Vec<_> = match &args.name {
        Some(name) => demos.into_iter().filter(|d| d.qualname() == name).collect(),
        None => demos,
    };

    if selected.is_empty() {
        eprintln!("error: no demo function named {:?}", args.name.unwrap_or_default());
        std::process::exit(2);
    }

    let no_classes = demo::NoClasses;
    let classes = ClassRegistry::new(&no_classes);
    let driver = CallDriver::new(classes);

    let mut any_refuted = false;
    for contract_fn in &selected {
        println!("== {} ==", contract_fn.qualname());
        for tree in driver.verify(contract_fn.as_ref(), &options) {
            println!("  verdict: {:?} ({} confirmed paths)", tree.verification_status, tree.num_confirmed_paths);
            for message in &tree.messages {
                let marker = match message.kind {
                    MessageKind::Confirmed => "ok",
                    _ => "!!",
                };
                println!(
                    "  {marker} {}:{}:{}: {}",
                    message.location.file, message.location.line, message.location.column, message.text
                );
            }
            if tree.verification_status == VerificationStatus::Refuted {
                any_refuted = true;
            }
        }
    }

    if any_refuted {
        std::process::exit(1);
    }
}
