//! Balance query command: bound room, campus building list, or a
//! specific room.

use chrono::Local;
use wattbind_core::{
    query_room, segment, segment_consumption, ChatIdentity, RoomKey, RoomStatus,
    ValidationError,
};

use super::common::Ctx;

pub async fn run(
    ctx: &Ctx,
    identity: &ChatIdentity,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    if !ctx.limiter.check_and_record(identity)? {
        println!(
            "Query limit reached: at most {} queries per hour for {identity}. Try again later.",
            ctx.config.rate_limit.threshold
        );
        return Ok(());
    }

    match args {
        [] => {
            let Some(binding) = ctx.bindings.binding_for(identity)? else {
                return Err(ValidationError::NotBound.into());
            };
            let status = query_room(&ctx.api, &ctx.history, &binding.room).await?;
            println!("Balance for your bound room:");
            print_status(ctx, &binding.room, &status)?;
        }
        [campus] => {
            let buildings = ctx.api.buildings(campus).await?;
            println!("Buildings in campus {campus}:");
            for name in buildings.keys() {
                println!("  {name}");
            }
        }
        [campus, building, room] => {
            let room = RoomKey::new(campus.clone(), building.clone(), room.clone());
            let status = query_room(&ctx.api, &ctx.history, &room).await?;
            print_status(ctx, &room, &status)?;
        }
        _ => {
            return Err(ValidationError::BadArgs(
                "expected no arguments (bound room), one (campus) or three (campus building room)"
                    .into(),
            )
            .into());
        }
    }
    Ok(())
}

fn print_status(
    ctx: &Ctx,
    room: &RoomKey,
    status: &RoomStatus,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Campus:   {}", room.campus);
    println!("Building: {}", room.building);
    println!("Room:     {}", room.room);
    println!("Remaining balance: {:.2} kWh", status.reading.value);

    let series = ctx.history.series(room)?;
    if let Some(consumption) = segment(&series).last().and_then(segment_consumption) {
        println!(
            "Average consumption: {:.2} kWh/h ({:.0} W)",
            consumption.units_per_hour, consumption.watts
        );
    }

    if let Some(exhaustion) = status.prediction.as_ref().and_then(|p| p.exhaustion_time) {
        println!(
            "Estimated depletion: {}",
            exhaustion.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
