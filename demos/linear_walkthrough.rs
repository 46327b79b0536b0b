//! Example binary: narrated walkthrough of one linear equation.
//!
//! Run:
//! - `cargo run --example linear_walkthrough`
//! - `RUST_LOG=debug cargo run --example linear_walkthrough -- "2n = -4n + 12"`
//! - `cargo run --example linear_walkthrough -- "x + 3 = 3x" --typst`
//!
//! What it does:
//! - Solves the equation and prints every step with its description.
//! - Builds the tutorial plan and dumps it as JSON (`--json`).
//! - Drives the plan against a scene with a scripted narrator and prints the
//!   resulting order of narration and reveals.
//!
//! `--typst` typesets with the embedded Typst fonts instead of the headless engine.

use anyhow::Context as _;

use stepcast::{
    driver::{NarrationEvent, ScriptedNarrator, TutorialDriver},
    engine::{RenderEngine, headless::HeadlessEngine},
    linear::solve_with_precision,
    plan_tutorial,
    scroll::ScrollManager,
    style::TutorialStyle,
};

fn main() -> anyhow::Result<()> {
    // Keep logging setup in the example binary.
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let typst = args.iter().any(|a| a == "--typst");
    let input = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("4n - 26 = -2");

    let style = TutorialStyle::default();
    let solution = solve_with_precision(input, style.solution_precision)
        .with_context(|| format!("solving {input:?}"))?;

    println!("{} (solve for {})", solution.input, solution.variable);
    for (i, step) in solution.steps.iter().enumerate() {
        println!("  step {}: {:<28} {}", i + 1, step.description().unwrap_or_default(), step.equation);
    }
    println!("outcome: {:?}", solution.outcome);

    if typst {
        #[cfg(feature = "typst")]
        {
            use stepcast::typst::{TypstEngine, TypstOptions};
            let engine = TypstEngine::new(TypstOptions::from(&style))?;
            return walkthrough(engine, style, input, json);
        }
        #[cfg(not(feature = "typst"))]
        anyhow::bail!("built without the `typst` feature");
    }
    walkthrough(HeadlessEngine::new(style.font_size_pt), style, input, json)
}

fn walkthrough<E: RenderEngine>(
    mut engine: E,
    style: TutorialStyle,
    input: &str,
    json: bool,
) -> anyhow::Result<()> {
    let plan = plan_tutorial(&mut engine, style.clone(), input)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }

    let mut driver = TutorialDriver::new(ScrollManager::new(engine, style), ScriptedNarrator::default());
    let report = driver.run(&plan)?;

    println!();
    println!("narration:");
    for event in driver.narrator().events() {
        match event {
            NarrationEvent::Voiceover { text, start_s, .. } => println!("  {start_s:7.2}s  say  {text}"),
            NarrationEvent::Bookmark { name, at_s } => println!("  {at_s:7.2}s  mark {name}"),
            NarrationEvent::Finished { at_s } => println!("  {at_s:7.2}s  done"),
        }
    }
    println!();
    println!(
        "revealed {} fragment(s) in {:.2}s, outcome {:?}",
        report.revealed, report.clock_s, report.outcome
    );
    Ok(())
}
