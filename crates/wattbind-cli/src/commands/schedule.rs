//! Daily scheduled query management.

use clap::Subcommand;
use wattbind_core::{parse_hhmm, ChatIdentity, ValidationError};

use super::common::Ctx;

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Set (or replace) the daily query time, 24-hour HH:MM
    Set { time: String },
    /// Show the current daily query time
    Show,
    /// Cancel the daily query
    Cancel,
}

pub fn run(
    ctx: &Ctx,
    identity: &ChatIdentity,
    action: ScheduleAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(binding) = ctx.bindings.binding_for(identity)? else {
        return Err(ValidationError::NotBound.into());
    };

    match action {
        ScheduleAction::Set { time } => {
            let (hour, minute) = parse_hhmm(time.trim())?;
            ctx.bindings.set_schedule(&binding.id, hour, minute)?;
            println!(
                "Daily query scheduled at {hour:02}:{minute:02} for {}. \
                 A running serve daemon picks this up on its next start.",
                binding.room
            );
        }
        ScheduleAction::Show => match ctx.bindings.schedule_for(&binding.id)? {
            Some(entry) => println!(
                "Daily query at {:02}:{:02} for {}",
                entry.hour, entry.minute, binding.room
            ),
            None => println!("No daily query scheduled."),
        },
        ScheduleAction::Cancel => {
            if ctx.bindings.delete_schedule(&binding.id)? {
                println!("Daily query cancelled.");
            } else {
                println!("No daily query was scheduled.");
            }
        }
    }
    Ok(())
}
