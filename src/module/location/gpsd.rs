//! gpsd client.
//!
//! Speaks the gpsd JSON protocol: enable watch mode, then read reports line by
//! line until a TPV report carries a 2D or 3D fix.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::{LocationError, Position, PositionProvider};

const WATCH: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

/// Position provider backed by a gpsd daemon.
#[derive(Debug, Clone)]
pub struct Gpsd {
    addr: String,
    timeout: Duration,
}

/// The subset of a gpsd report this client reads.
#[derive(Debug, Deserialize)]
struct Report {
    class: String,
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
    epx: Option<f64>,
    epy: Option<f64>,
    eph: Option<f64>,
}

impl Gpsd {
    pub fn new(addr: String, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    async fn read_fix(&self) -> Result<Position, LocationError> {
        let mut stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            LocationError::Unavailable(format!("Can't reach gpsd at {}: {}", self.addr, e))
        })?;
        stream
            .write_all(WATCH)
            .await
            .map_err(|e| LocationError::Unavailable(format!("gpsd watch failed: {}", e)))?;

        let mut lines = BufReader::new(stream).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| LocationError::Unavailable(format!("gpsd read failed: {}", e)))?
        {
            if let Some(position) = parse_tpv(&line) {
                return Ok(position);
            }
        }
        Err(LocationError::Unavailable(
            "gpsd closed the connection before a fix".to_string(),
        ))
    }
}

#[async_trait]
impl PositionProvider for Gpsd {
    async fn current_position(&self) -> Result<Position, LocationError> {
        match tokio::time::timeout(self.timeout, self.read_fix()).await {
            Ok(res) => res,
            Err(_) => Err(LocationError::Unavailable(format!(
                "no fix within {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Position from a TPV report with a fix, `None` for anything else.
fn parse_tpv(line: &str) -> Option<Position> {
    let report: Report = match serde_json::from_str(line) {
        Ok(report) => report,
        Err(e) => {
            log::debug!("Skipping gpsd line {:?}: {}", line, e);
            return None;
        }
    };
    if report.class != "TPV" || report.mode < 2 {
        return None;
    }
    let accuracy = match (report.epx, report.epy) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(e), None) | (None, Some(e)) => Some(e),
        (None, None) => report.eph,
    };
    Some(Position {
        latitude: report.lat?,
        longitude: report.lon?,
        accuracy,
    })
}
