//! Optimal-device recommendation payloads.

use crate::DeviceSnapshot;

/// Raw response of the optimal-device query.
///
/// The service answers either `{"found": true, "gpu_index": .., "gpu_info": ..}`
/// or `{"found": false, "message": ..}`. Use [`RecommendationResponse::into_recommendation`]
/// to turn it into a [`Recommendation`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecommendationResponse {
    pub found: bool,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub gpu_index: Option<u32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub gpu_info: Option<DeviceSnapshot>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub message: Option<String>,
}

impl RecommendationResponse {
    /// Convert into a [`Recommendation`].
    ///
    /// Returns `None` when the service claims a device was found but did not
    /// say which one.
    pub fn into_recommendation(self) -> Option<Recommendation> {
        if self.found {
            let device_index = self.gpu_index?;
            Some(Recommendation::Found {
                device_index,
                info: self.gpu_info,
            })
        } else {
            Some(Recommendation::NotFound {
                message: self.message.unwrap_or_default(),
            })
        }
    }
}

/// The service's answer to "which device should I use?".
#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    /// A device satisfies the request.
    Found {
        device_index: u32,
        /// Snapshot of the device at decision time, when the service included it.
        info: Option<DeviceSnapshot>,
    },
    /// No device satisfies the request.
    NotFound { message: String },
}

impl Recommendation {
    pub fn is_found(&self) -> bool {
        matches!(self, Recommendation::Found { .. })
    }
}
