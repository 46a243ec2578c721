// agent-router-server/src/handlers/blueprint.rs
// ============================================================================
// Module: Blueprint Model Registry
// Description: Versioned symbol-detection models and the active selection.
// Purpose: Serve the frozen `blueprint_list_models` tool.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Detection models are registered statically. The active model comes from
//! configuration and falls back to the first registered model when the id
//! is unknown. Responses from this tool are frozen output and carry the
//! vertex stamp.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use serde_json::json;

use super::ToolServices;
use crate::tools::ToolDefinition;
use crate::tools::ToolRegistry;

// ============================================================================
// SECTION: Models
// ============================================================================

/// Low-voltage and electrical symbol classes, in model output order.
pub const LV_CLASSES: &[&str] = &[
    "data_drop",
    "wireless_ap",
    "cctv_camera",
    "card_reader",
    "door_contact",
    "fire_alarm",
    "smoke_detector",
    "pull_station",
    "horn_strobe",
    "speaker",
    "intercom",
    "outlet",
    "switch",
    "light_fixture",
    "junction_box",
    "panel",
    "conduit",
    "cable_tray",
];

/// Detection model description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionModel {
    /// Model identifier.
    pub model_id: &'static str,
    /// Semantic version.
    pub version: &'static str,
    /// Network architecture.
    pub architecture: &'static str,
    /// Square input size in pixels.
    pub input_size: u32,
    /// Ordered class list.
    pub classes: &'static [&'static str],
    /// Global confidence threshold.
    pub default_threshold: f64,
    /// Per-class threshold overrides.
    pub class_thresholds: &'static [(&'static str, f64)],
    /// Human-readable description.
    pub description: &'static str,
    /// Weights path relative to the model directory.
    pub weights_path: &'static str,
    /// Whether the model can be fine-tuned.
    pub trainable: bool,
}

impl DetectionModel {
    /// Returns the confidence threshold for `class_name`.
    #[must_use]
    pub fn threshold_for(&self, class_name: &str) -> f64 {
        self.class_thresholds
            .iter()
            .find(|(name, _)| *name == class_name)
            .map_or(self.default_threshold, |(_, threshold)| *threshold)
    }

    /// Renders the model as JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let thresholds: BTreeMap<&str, f64> = self.class_thresholds.iter().copied().collect();
        json!({
            "model_id": self.model_id,
            "version": self.version,
            "architecture": self.architecture,
            "input_size": self.input_size,
            "classes": self.classes,
            "class_count": self.classes.len(),
            "default_threshold": self.default_threshold,
            "class_thresholds": thresholds,
            "description": self.description,
            "weights_path": self.weights_path,
            "trainable": self.trainable,
        })
    }
}

/// Registered models, in registration order.
pub const MODELS: &[DetectionModel] = &[
    DetectionModel {
        model_id: "yolov8n-blueprint-v1",
        version: "1.0.0",
        architecture: "YOLOv8n",
        input_size: 640,
        classes: LV_CLASSES,
        default_threshold: 0.25,
        class_thresholds: &[("conduit", 0.35), ("cable_tray", 0.35), ("junction_box", 0.30)],
        description: "YOLOv8 nano baseline for blueprint symbol detection. Optimized for speed \
                      on CPU inference.",
        weights_path: "models/yolov8n-blueprint-v1.pt",
        trainable: true,
    },
    DetectionModel {
        model_id: "yolov8s-blueprint-v2",
        version: "2.0.0",
        architecture: "YOLOv8s",
        input_size: 640,
        classes: LV_CLASSES,
        default_threshold: 0.30,
        class_thresholds: &[
            ("conduit", 0.40),
            ("cable_tray", 0.40),
            ("junction_box", 0.35),
            ("light_fixture", 0.30),
        ],
        description: "YOLOv8 small model with improved accuracy. Recommended for production use \
                      when GPU is available.",
        weights_path: "models/yolov8s-blueprint-v2.pt",
        trainable: true,
    },
    DetectionModel {
        model_id: "yolov8m-blueprint-v3",
        version: "3.0.0",
        architecture: "YOLOv8m",
        input_size: 1280,
        classes: LV_CLASSES,
        default_threshold: 0.35,
        class_thresholds: &[("conduit", 0.45), ("cable_tray", 0.45)],
        description: "YOLOv8 medium model for maximum accuracy on high-res blueprints. Requires \
                      GPU for reasonable inference times.",
        weights_path: "models/yolov8m-blueprint-v3.pt",
        trainable: true,
    },
];

/// Returns the model with `model_id`.
#[must_use]
pub fn get_model(model_id: &str) -> Option<&'static DetectionModel> {
    MODELS.iter().find(|model| model.model_id == model_id)
}

/// Returns the active model, falling back to the first registered one.
#[must_use]
pub fn active_model(active_id: &str) -> &'static DetectionModel {
    get_model(active_id).unwrap_or(&MODELS[0])
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Registers `blueprint_list_models`.
pub(crate) fn register(registry: &mut ToolRegistry, services: &ToolServices) {
    let active_id = services.settings.active_model.clone();
    registry.register(
        ToolDefinition::new(
            "blueprint_list_models",
            "List registered blueprint symbol-detection models and the active model.",
            json!({"type": "object", "properties": {}}),
        )
        .frozen(),
        move |_arguments: Value| {
            let models: Vec<Value> = MODELS.iter().map(DetectionModel::to_value).collect();
            Ok(json!({
                "ok": true,
                "model_count": models.len(),
                "active_model_id": active_model(&active_id).model_id,
                "models": models,
            }))
        },
    );
}
