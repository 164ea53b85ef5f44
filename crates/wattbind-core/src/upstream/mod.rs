//! Upstream campus balance API client.
//!
//! The API is a form-POST endpoint that multiplexes query types through a
//! `funname` field and a JSON-encoded `jsondata` payload, answering with
//! JSON that wraps a human-readable message. The reading value is the
//! first decimal number in that message. Building lists change rarely and
//! are cached per campus for the process lifetime.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{CoreError, UpstreamError, ValidationError};
use crate::storage::{Reading, RoomKey, UpstreamConfig};

/// A dormitory building within a campus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub name: String,
    pub id: String,
    pub campus: String,
}

/// Client for the campus balance API.
pub struct CampusApi {
    http: Client,
    base_url: String,
    account: String,
    /// Campus name -> upstream area id.
    campuses: BTreeMap<String, String>,
    buildings_cache: Mutex<HashMap<String, BTreeMap<String, Building>>>,
    value_re: Regex,
}

impl CampusApi {
    /// Build a client from configuration. The HTTP client carries a
    /// bounded request timeout.
    pub fn new(config: &UpstreamConfig) -> Result<Self, CoreError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.query_timeout_secs))
            .build()
            .map_err(UpstreamError::Network)?;
        let value_re = Regex::new(r"\d+(\.\d+)?")
            .map_err(|e| UpstreamError::Parse(format!("value pattern: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            account: config.account.clone(),
            campuses: config.campuses.clone(),
            buildings_cache: Mutex::new(HashMap::new()),
            value_re,
        })
    }

    /// Configured campus names, sorted.
    pub fn campus_names(&self) -> Vec<String> {
        self.campuses.keys().cloned().collect()
    }

    fn area_id(&self, campus: &str) -> Result<&str, ValidationError> {
        self.campuses
            .get(campus)
            .map(String::as_str)
            .ok_or_else(|| ValidationError::UnknownCampus {
                name: campus.to_string(),
                available: self.campus_names().join(", "),
            })
    }

    /// Upstream expects the display form of a campus name in area fields.
    fn area_name(campus: &str) -> String {
        format!("{campus}校区")
    }

    async fn post_query(
        &self,
        funname: &str,
        jsondata: &serde_json::Value,
    ) -> Result<serde_json::Value, UpstreamError> {
        let form = [
            ("jsondata", jsondata.to_string()),
            ("funname", funname.to_string()),
            ("json", "true".to_string()),
        ];
        let response = self
            .http
            .post(&self.base_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;
        Ok(body)
    }

    /// Buildings of a campus, keyed by building name. Served from the
    /// cache after the first successful fetch.
    pub async fn buildings(&self, campus: &str) -> Result<BTreeMap<String, Building>, CoreError> {
        let area_id = self.area_id(campus)?.to_string();

        {
            let cache = self.buildings_cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(buildings) = cache.get(campus) {
                debug!(campus, "building list served from cache");
                return Ok(buildings.clone());
            }
        }

        let jsondata = json!({
            "query_elec_building": {
                "aid": area_id,
                "account": self.account,
                "area": {
                    "area": Self::area_name(campus),
                    "areaname": Self::area_name(campus),
                }
            }
        });
        let body = self
            .post_query("synjones.onecard.query.elec.building", &jsondata)
            .await?;

        let tab = body
            .get("query_elec_building")
            .and_then(|q| q.get("buildingtab"))
            .and_then(|t| t.as_array())
            .ok_or_else(|| {
                UpstreamError::Parse(format!("unexpected building response shape: {body}"))
            })?;

        let mut buildings = BTreeMap::new();
        for item in tab {
            let (Some(name), Some(id)) = (
                item.get("building").and_then(|v| v.as_str()),
                item.get("buildingid").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            buildings.insert(
                name.to_string(),
                Building {
                    name: name.to_string(),
                    id: id.to_string(),
                    campus: campus.to_string(),
                },
            );
        }

        if buildings.is_empty() {
            return Err(UpstreamError::Parse(format!(
                "no buildings returned for campus {campus}"
            ))
            .into());
        }

        info!(campus, count = buildings.len(), "building list fetched");
        self.buildings_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(campus.to_string(), buildings.clone());
        Ok(buildings)
    }

    /// Fetch the current balance reading for a room.
    pub async fn fetch_reading(&self, room: &RoomKey) -> Result<Reading, CoreError> {
        let area_id = self.area_id(&room.campus)?.to_string();

        let buildings = self.buildings(&room.campus).await?;
        let building =
            buildings
                .get(&room.building)
                .ok_or_else(|| ValidationError::UnknownBuilding {
                    name: room.building.clone(),
                    campus: room.campus.clone(),
                })?;

        let jsondata = json!({
            "query_elec_roominfo": {
                "aid": area_id,
                "account": self.account,
                "room": { "roomid": room.room, "room": room.room },
                "floor": { "floorid": "", "floor": "" },
                "area": {
                    "area": Self::area_name(&room.campus),
                    "areaname": Self::area_name(&room.campus),
                },
                "building": { "buildingid": building.id, "building": "" }
            }
        });
        let body = self
            .post_query("synjones.onecard.query.elec.roominfo", &jsondata)
            .await?;

        let info = body.get("query_elec_roominfo").ok_or_else(|| {
            UpstreamError::Parse(format!("unexpected room response shape: {body}"))
        })?;

        if let Some(error) = info.get("error").and_then(|v| v.as_str()) {
            if error != "0" {
                let message = info
                    .get("errmsg")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown upstream error");
                return Err(UpstreamError::NotFound(message.to_string()).into());
            }
        }

        let message = info
            .get("errmsg")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| UpstreamError::Parse("no balance message returned".into()))?;

        let value = self
            .value_re
            .find(message)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .ok_or_else(|| {
                UpstreamError::Parse(format!("no balance value in message: {message}"))
            })?;

        Ok(Reading {
            recorded_at: Utc::now(),
            value,
        })
    }
}
