use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a stage produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Derive a keyframe image from the reference.
    Image,
    /// Render a video clip from the current reference.
    Video,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Image => "image",
            StageKind::Video => "video",
        }
    }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    pub label: String,
    pub kind: StageKind,
    pub prompt: String,
}

impl StageSpec {
    pub fn image(label: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: StageKind::Image,
            prompt: prompt.into(),
        }
    }

    pub fn video(label: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: StageKind::Video,
            prompt: prompt.into(),
        }
    }
}

/// Ordered stage list plus the subject sentence appended to every prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePlan {
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_stages")]
    pub stages: Vec<StageSpec>,
}

impl Default for StagePlan {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            stages: default_stages(),
        }
    }
}

fn default_subject() -> String {
    "The product shown in the reference image.".to_string()
}

/// Three keyframes: light reveal, steam close-up, hand interaction.
fn default_stages() -> Vec<StageSpec> {
    vec![
        StageSpec::image(
            "reveal-keyframe",
            "Cinematic shot of the product on a wooden table, warm sunlight hitting it from the side. High quality, photorealistic, 8k.",
        ),
        StageSpec::video(
            "reveal",
            "Cinematic establishing shot. Warm sunlight sweeps across the surface, revealing the product clearly. Dust motes dance in the light beam.",
        ),
        StageSpec::image(
            "steam-keyframe",
            "Close up of the product with hot steam rising from it. Dark moody background. High quality, photorealistic.",
        ),
        StageSpec::video(
            "steam",
            "Extreme close-up macro shot. Thick, swirling hot steam rises elegantly from the product. Dark moody background with bokeh. Slow motion.",
        ),
        StageSpec::image(
            "interaction-keyframe",
            "A human hand reaching out to grab the product. First person perspective. Realistic skin texture.",
        ),
        StageSpec::video(
            "interaction",
            "First person view. A hand enters the frame naturally and lifts the product up smoothly from the table.",
        ),
    ]
}

impl StagePlan {
    pub fn new(subject: impl Into<String>, stages: Vec<StageSpec>) -> Self {
        Self {
            subject: subject.into(),
            stages,
        }
    }

    /// Prompt sent to the provider for `stage`.
    pub fn render_prompt(&self, stage: &StageSpec) -> String {
        let subject = self.subject.trim();
        if subject.is_empty() {
            stage.prompt.clone()
        } else {
            format!("{} Subject: {}", stage.prompt.trim_end(), subject)
        }
    }

    pub fn video_stage_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.kind == StageKind::Video)
            .count()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// A downloaded clip waiting for assembly. Ordered by `stage_index`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClipRecord {
    pub stage_index: usize,
    pub local_path: PathBuf,
}

impl ClipRecord {
    pub fn new(stage_index: usize, local_path: impl Into<PathBuf>) -> Self {
        Self {
            stage_index,
            local_path: local_path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_shape() {
        let plan = StagePlan::default();
        assert_eq!(plan.len(), 6);
        assert_eq!(plan.video_stage_count(), 3);

        let kinds: Vec<_> = plan.stages.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StageKind::Image,
                StageKind::Video,
                StageKind::Image,
                StageKind::Video,
                StageKind::Image,
                StageKind::Video,
            ]
        );
    }

    #[test]
    fn test_render_prompt_appends_subject() {
        let plan = StagePlan::new("A red mug.", vec![StageSpec::video("a", "Slow pan. ")]);
        assert_eq!(plan.render_prompt(&plan.stages[0]), "Slow pan. Subject: A red mug.");
    }

    #[test]
    fn test_render_prompt_without_subject() {
        let plan = StagePlan::new("  ", vec![StageSpec::video("a", "Slow pan.")]);
        assert_eq!(plan.render_prompt(&plan.stages[0]), "Slow pan.");
    }

    #[test]
    fn test_clip_records_sort_by_stage_index() {
        let mut clips = vec![
            ClipRecord::new(5, "c.mp4"),
            ClipRecord::new(1, "a.mp4"),
            ClipRecord::new(3, "b.mp4"),
        ];
        clips.sort();
        let order: Vec<_> = clips.iter().map(|c| c.stage_index).collect();
        assert_eq!(order, vec![1, 3, 5]);
    }
}
