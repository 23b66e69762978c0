use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{Parser, ValueEnum};
use nerbench::{
    harness::run_suite, scenario, Annotator, CommandAnnotator, ConllEval, HarnessConfig, Scenario, Scorer,
    ScriptScorer,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScorerKind {
    /// run <WORK_DIR>/eval_conll_cmd.sh
    Script,
    /// score in process
    Builtin,
}

/// Run NER regression scenarios and check each FB1 score against its threshold
#[derive(Debug, Parser)]
#[command(version)]
struct Argv {
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// directory holding gold files, the scoring script and intermediate reports
    #[arg(short, long, default_value = ".")]
    work_dir: PathBuf,
    /// read the scenario table from a JSON file instead of the built-in one
    #[arg(short, long, value_name = "FILE")]
    scenarios: Option<PathBuf>,
    /// list scenarios and exit
    #[arg(long)]
    list: bool,
    #[arg(long, value_enum, default_value_t = ScorerKind::Script)]
    scorer: ScorerKind,
    /// seconds before the scoring script is killed
    #[arg(long, default_value_t = 600)]
    scorer_timeout: u64,
    /// seconds before a single pipeline call is killed
    #[arg(long, default_value_t = 300)]
    annotate_timeout: u64,
    /// keep the scorer input file of every scenario
    #[arg(long)]
    keep_report: bool,
    /// print the summary as JSON
    #[arg(long)]
    json: bool,
    /// pipeline program, called once per document with the text on stdin
    #[arg(long, value_name = "PROGRAM", required_unless_present = "list")]
    annotator_cmd: Option<PathBuf>,
    /// extra argument passed to the pipeline before the scenario options
    #[arg(long = "annotator-arg", value_name = "ARG", allow_hyphen_values = true)]
    annotator_args: Vec<String>,
    /// pipeline output column holding the word
    #[arg(long, default_value_t = 0)]
    word_column: usize,
    /// pipeline output column holding the predicted label
    #[arg(long, default_value_t = 1)]
    label_column: usize,
    /// scenarios to run, by name; all when omitted
    #[arg(value_name = "SCENARIO")]
    names: Vec<String>,
}

fn main() -> ExitCode {
    let argv = Argv::parse();
    let level = match argv.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::builder().filter_level(level).parse_default_env().init();
    log::debug!("{:?}", argv);

    let table = match &argv.scenarios {
        Some(path) => scenario::load(path),
        None => Ok(scenario::builtin()),
    };
    let scenarios = match table.and_then(|t| scenario::select(t, &argv.names)) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(2);
        }
    };
    if argv.list {
        for s in &scenarios {
            println!("{:<36} {:>6.2}  {}", s.name, s.threshold, s.gold_file.display());
        }
        return ExitCode::SUCCESS;
    }

    let config = HarnessConfig::new(&argv.work_dir)
        .scorer_timeout(Duration::from_secs(argv.scorer_timeout))
        .annotate_timeout(Duration::from_secs(argv.annotate_timeout))
        .keep_report(argv.keep_report);
    let scorer: Box<dyn Scorer> = match argv.scorer {
        ScorerKind::Script => Box::new(ScriptScorer::new(config.work_dir(), config.scorer_timeout)),
        ScorerKind::Builtin => Box::new(ConllEval),
    };
    let program = argv.annotator_cmd.clone().unwrap_or_default();
    let make_annotator = |s: &Scenario| -> nerbench::Result<Box<dyn Annotator>> {
        let annotator = argv
            .annotator_args
            .iter()
            .fold(CommandAnnotator::new(&program), |a, arg| a.arg(arg))
            .options(&s.options)
            .columns(argv.word_column, argv.label_column)
            .timeout(config.annotate_timeout);
        Ok(Box::new(annotator))
    };

    let report = run_suite(&config, &scenarios, make_annotator, scorer.as_ref());
    if argv.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("failed to serialize summary: {e}"),
        }
    } else {
        println!("{report}");
    }
    if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
