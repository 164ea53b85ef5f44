//! Bind and unbind a chat identity to a room.

use wattbind_core::{ChatIdentity, RoomKey, ValidationError};

use super::common::Ctx;

pub async fn run_bind(
    ctx: &Ctx,
    identity: &ChatIdentity,
    campus: String,
    building: String,
    room: String,
) -> Result<(), Box<dyn std::error::Error>> {
    // Validate campus and building against the live building list before
    // persisting anything.
    let buildings = ctx.api.buildings(&campus).await?;
    if !buildings.contains_key(&building) {
        return Err(ValidationError::UnknownBuilding {
            name: building,
            campus,
        }
        .into());
    }

    let key = RoomKey::new(campus, building, room);
    let binding = ctx.bindings.set_binding(identity, &key)?;
    println!("Bound {identity} to {key} (binding {})", binding.id);
    Ok(())
}

pub fn run_unbind(
    ctx: &Ctx,
    identity: &ChatIdentity,
) -> Result<(), Box<dyn std::error::Error>> {
    match ctx.bindings.delete_binding(identity)? {
        Some(_) => println!("Unbound {identity}; any daily schedule was removed with it."),
        None => println!("No binding exists for {identity}."),
    }
    Ok(())
}
