mod builder;

use builder::build;
use chain::DiagnosticSink;
use chain::RenderError;
use clap::Parser;
use colored::Colorize;
use std::cell::RefCell;
use std::io;
use std::io::BufRead;
use std::process::ExitCode;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use trigger::Clock;
use trigger::DelayedTrigger;
use trigger::QueueScheduler;
use trigger::SystemClock;

#[derive(Debug, Parser)]
#[command(
    name = "rxcraft",
    about = "Decompose a regular expression into a chain of construction nodes"
)]
struct Cli {
    /// Pattern to decompose.
    #[clap(short = 'E', long = "expression")]
    pattern: Option<String>,
    /// Also print the rendered markup.
    #[clap(long)]
    markup: bool,
    /// Report, per node, whether it accepts this probe string.
    #[clap(long)]
    probe: Option<String>,
    /// Read pattern edits from stdin and render once the burst settles.
    #[clap(long)]
    watch: bool,
    /// Debounce delay for --watch, in milliseconds.
    #[clap(long, default_value = "200")]
    delay: u64,
}

struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn render_failure(&mut self, identifier: Option<&str>, error: &RenderError) {
        let key = identifier.unwrap_or("<anonymous>");
        eprintln!(
            "{} {}",
            format!("node {key} failed to render:").red().bold(),
            error
        );
    }
}

fn inspect(pattern: &str, markup: bool, probe: Option<&str>) -> bool {
    let built = match build(pattern) {
        Ok(built) => built,
        Err(error) => {
            eprintln!("{} {}", "invalid pattern:".red().bold(), error);
            return false;
        }
    };
    let Some(head) = built.head else {
        eprintln!("empty pattern, nothing to describe");
        return false;
    };

    let chain = built.chain;
    println!("{}", chain.describe_chain(head));
    if let Some(probe) = probe {
        for id in chain.iter_from(head) {
            let verdict = if chain.matches(id, probe) {
                "accepts".green()
            } else {
                "rejects".red()
            };
            println!("  {} {} '{}'", chain.describe(id), verdict, probe);
        }
    }
    if markup {
        let mut sink = StderrSink;
        println!("{}", chain.render_chain_markup(head, &mut sink));
    }
    true
}

/// Reads pattern edits line by line and re-renders through a debounce
/// trigger, so a burst of edits produces a single render of the final
/// pattern.
fn watch(markup: bool, delay: u64) -> bool {
    let queue = QueueScheduler::new();
    let clock = Rc::new(SystemClock::new());
    let latest = Rc::new(RefCell::new(String::new()));

    let pending_pattern = Rc::clone(&latest);
    let mut refresh = DelayedTrigger::new(
        queue.clone(),
        Rc::clone(&clock),
        delay,
        move || {
            inspect(&pending_pattern.borrow(), markup, None);
            Ok(())
        },
    )
    .adaptive_speed(0.1);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        *latest.borrow_mut() = line.trim().to_string();
        refresh.reset(None);
        for deadline in queue.take_due(clock.now()) {
            refresh.fire(deadline);
        }
    }

    // Input is over; wait out the debounce and deliver the final render.
    while queue.pending() > 0 {
        let due = queue.take_due(clock.now());
        if due.is_empty() {
            thread::sleep(Duration::from_millis(10));
            continue;
        }
        for deadline in due {
            refresh.fire(deadline);
        }
    }
    true
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Cli::parse();

    let ok = if args.watch {
        watch(args.markup, args.delay)
    } else if let Some(pattern) = args.pattern.as_deref() {
        inspect(pattern, args.markup, args.probe.as_deref())
    } else {
        eprintln!("provide -E/--expression or --watch");
        false
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
