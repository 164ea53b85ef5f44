//! Clear the bound room's reading history.

use wattbind_core::{ChatIdentity, ValidationError};

use super::common::Ctx;

pub fn run(ctx: &Ctx, identity: &ChatIdentity) -> Result<(), Box<dyn std::error::Error>> {
    let Some(binding) = ctx.bindings.binding_for(identity)? else {
        return Err(ValidationError::NotBound.into());
    };

    let removed = ctx.history.clear(&binding.room)?;
    println!("Cleared {removed} stored reading(s) for {}.", binding.room);
    Ok(())
}
