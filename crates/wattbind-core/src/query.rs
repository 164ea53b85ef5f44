//! The combined query flow: fetch a fresh reading, record it, predict.

use tracing::debug;

use crate::error::CoreError;
use crate::prediction::{predict_depletion, PredictionResult};
use crate::storage::{HistoryDb, Reading, RoomKey};
use crate::upstream::CampusApi;

/// Result of querying one room: the fresh reading and the depletion
/// prediction derived from the updated history.
#[derive(Debug, Clone)]
pub struct RoomStatus {
    pub room: RoomKey,
    pub reading: Reading,
    /// Whether the reading was new (false when it repeated the last
    /// stored value).
    pub stored: bool,
    pub prediction: Option<PredictionResult>,
}

/// Fetch the current balance for a room, append it to history, and
/// predict the depletion time from the latest discharge segment.
pub async fn query_room(
    api: &CampusApi,
    history: &HistoryDb,
    room: &RoomKey,
) -> Result<RoomStatus, CoreError> {
    let reading = api.fetch_reading(room).await?;
    let stored = history.append(room, &reading)?;
    if !stored {
        debug!(room = %room, value = reading.value, "reading unchanged, not stored");
    }
    let prediction = predict_depletion(history, room)?;
    Ok(RoomStatus {
        room: room.clone(),
        reading,
        stored,
        prediction,
    })
}
