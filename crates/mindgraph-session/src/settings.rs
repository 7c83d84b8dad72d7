use mindgraph_core::{LayoutDirection, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub direction: LayoutDirection,
    pub layer_spacing: f32,
    pub node_spacing: f32,
    pub node_width: f32,
    pub node_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::Horizontal,
            layer_spacing: 240.0,
            node_spacing: 60.0,
            node_width: 160.0,
            node_height: 40.0,
        }
    }
}

impl LayoutConfig {
    pub fn node_size(&self) -> Vec2 {
        Vec2::new(self.node_width, self.node_height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub layout: LayoutConfig,
    /// Gap between the extent of held content and the next merged batch.
    pub batch_gap: f32,
    pub history_capacity: usize,
    pub max_caption_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            batch_gap: 120.0,
            history_capacity: 50,
            max_caption_chars: mindgraph_core::DEFAULT_MAX_CAPTION_CHARS,
        }
    }
}
