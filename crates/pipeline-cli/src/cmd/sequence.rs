use crate::backend::open_engine;
use crate::output::{print_json, print_table};
use clap::Subcommand;
use pipeline_core::types::Personality;
use std::path::Path;

#[derive(Subcommand)]
pub enum SequenceSubcommand {
    /// List the steps of a sequence that apply to a personality
    Steps { sequence: String, personality: u8 },
}

pub fn run(root: &Path, subcmd: SequenceSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        SequenceSubcommand::Steps {
            sequence,
            personality,
        } => steps(root, &sequence, Personality(personality), json),
    }
}

fn steps(root: &Path, sequence: &str, personality: Personality, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root, false)?;
    let steps = engine
        .sequences()
        .steps_by_personality(sequence, personality)?;

    if json {
        return print_json(&steps);
    }
    let rows = steps
        .iter()
        .map(|s| {
            vec![
                s.position.to_string(),
                s.id.clone(),
                format!("+{}d", s.timespan),
                s.channel.to_string(),
                s.message.clone(),
            ]
        })
        .collect();
    print_table(&["POS", "STEP", "AFTER", "CHANNEL", "MESSAGE"], rows);
    Ok(())
}
