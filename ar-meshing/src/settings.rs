use core::time::Duration;

/// Tunable parameters for hosting a [`MeshReconciler`](crate::MeshReconciler) and a
/// [`RendererBinding`](crate::RendererBinding).
///
/// Every field has a default, so a configuration file need only mention the ones it
/// changes.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct MeshingSettings {
    /// Maximum number of reconciliation passes the host should run per second.
    pub target_frame_rate: u32,

    /// Block edge length, in meters, to request from the producer.
    pub target_block_size: f32,

    /// Number of content versions a block's collision representation may fall behind its
    /// visual geometry before it is rebuilt. Zero or negative means it is rebuilt on every
    /// geometry change.
    pub collider_update_throttle: i32,

    /// Number of blocks to size the flat buffers for before the first pass.
    pub initial_block_capacity: usize,

    /// Whether block updates start out paused.
    pub block_updates_paused: bool,

    /// Whether visual representations should use an invisible material, so that only
    /// occlusion and collision remain.
    pub use_invisible_material: bool,
}

impl MeshingSettings {
    /// Minimum time between passes implied by [`Self::target_frame_rate`].
    ///
    /// A rate of zero means passes are never due.
    pub fn pass_interval(&self) -> Option<Duration> {
        (self.target_frame_rate > 0)
            .then(|| Duration::from_secs(1) / self.target_frame_rate)
    }

    /// The [`MaterialMode`](crate::MaterialMode) implied by
    /// [`Self::use_invisible_material`].
    pub fn material_mode(&self) -> crate::MaterialMode {
        if self.use_invisible_material {
            crate::MaterialMode::Invisible
        } else {
            crate::MaterialMode::Visible
        }
    }
}

impl Default for MeshingSettings {
    fn default() -> Self {
        Self {
            target_frame_rate: 20,
            target_block_size: 1.4,
            collider_update_throttle: 10,
            initial_block_capacity: 100,
            block_updates_paused: false,
            use_invisible_material: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_uses_defaults() {
        let settings: MeshingSettings =
            serde_json::from_str(r#"{"collider_update_throttle": 3}"#).unwrap();
        assert_eq!(
            settings,
            MeshingSettings {
                collider_update_throttle: 3,
                ..MeshingSettings::default()
            }
        );
    }

    #[test]
    fn pass_interval() {
        let mut settings = MeshingSettings::default();
        assert_eq!(settings.pass_interval(), Some(Duration::from_millis(50)));
        settings.target_frame_rate = 0;
        assert_eq!(settings.pass_interval(), None);
    }
}
