//! Repair plan model and response shaping.
//!
//! The analyst model is asked for strict JSON, but model output drifts:
//! markdown fences, smart quotes, trailing commas, half-broken arrays.
//! Parsing here is deliberately forgiving and salvages what it can.

use crate::util::truncate;
use serde::{Deserialize, Serialize};

/// Plans longer than this get truncated at parse time.
pub const MAX_STEPS: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairPlan {
    pub title: String,
    pub summary: String,
    pub damage_report: String,
    pub scrap_inventory: String,
    pub steps: Vec<RepairStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairStep {
    pub title: String,
    pub description: String,
    pub materials: Vec<String>,
    pub rationale: String,
    pub action: ActionKind,
    pub image_prompt: String,
}

/// What kind of work a step asks of the user. Tags come back from the
/// model as free-ish strings; anything unrecognized lands on Improvise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Inspect,
    Clean,
    Measure,
    Cut,
    Shape,
    Join,
    Fasten,
    Seal,
    Reinforce,
    Test,
    Finish,
    Improvise,
}

impl ActionKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "inspect" | "assess" | "examine" => ActionKind::Inspect,
            "clean" | "prep" | "prepare" => ActionKind::Clean,
            "measure" | "mark" => ActionKind::Measure,
            "cut" | "trim" | "saw" => ActionKind::Cut,
            "shape" | "sand" | "file" | "carve" => ActionKind::Shape,
            "join" | "glue" | "attach" | "weld" => ActionKind::Join,
            "fasten" | "screw" | "bolt" | "tie" | "clamp" => ActionKind::Fasten,
            "seal" | "waterproof" | "caulk" => ActionKind::Seal,
            "reinforce" | "brace" | "support" | "splint" => ActionKind::Reinforce,
            "test" | "verify" | "check" => ActionKind::Test,
            "finish" | "paint" | "polish" => ActionKind::Finish,
            _ => ActionKind::Improvise,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Inspect => "inspect",
            ActionKind::Clean => "clean",
            ActionKind::Measure => "measure",
            ActionKind::Cut => "cut",
            ActionKind::Shape => "shape",
            ActionKind::Join => "join",
            ActionKind::Fasten => "fasten",
            ActionKind::Seal => "seal",
            ActionKind::Reinforce => "reinforce",
            ActionKind::Test => "test",
            ActionKind::Finish => "finish",
            ActionKind::Improvise => "improvise",
        }
    }
}

impl RepairPlan {
    /// Serialize the plan into the text block used to ground the chat
    /// session. The model sees exactly what the user sees.
    pub fn to_chat_context(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("REPAIR PLAN: {}\n", self.title));
        out.push_str(&format!("Summary: {}\n", self.summary));
        if !self.damage_report.is_empty() {
            out.push_str(&format!("Damage assessment: {}\n", self.damage_report));
        }
        if !self.scrap_inventory.is_empty() {
            out.push_str(&format!("Available scrap: {}\n", self.scrap_inventory));
        }
        out.push_str("Steps:\n");
        for (i, step) in self.steps.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} [{}]\n   {}\n",
                i + 1,
                step.title,
                step.action.label(),
                step.description
            ));
            if !step.materials.is_empty() {
                out.push_str(&format!("   Materials: {}\n", step.materials.join(", ")));
            }
            if !step.rationale.is_empty() {
                out.push_str(&format!("   Why: {}\n", step.rationale));
            }
        }
        out
    }
}

#[derive(Deserialize)]
struct PlanJson {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default, alias = "damageReport", alias = "object_damage")]
    damage_report: String,
    #[serde(default, alias = "scrapInventory", alias = "scrap_assessment")]
    scrap_inventory: String,
    #[serde(default)]
    steps: Vec<StepJson>,
}

#[derive(Deserialize)]
struct StepJson {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    materials: Vec<String>,
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    action: String,
    #[serde(default, alias = "imagePrompt", alias = "image_generation_prompt")]
    image_prompt: String,
}

/// Parse the analyst's raw response text into a usable plan.
pub fn parse_plan(response: &str) -> anyhow::Result<RepairPlan> {
    let clean = strip_markdown_fences(response);
    let sanitized = fix_json_issues(clean);

    let json_str = extract_json_fragment(&sanitized, '{', '}').unwrap_or(&sanitized);

    let parsed: PlanJson = match serde_json::from_str(json_str) {
        Ok(v) => v,
        Err(e) => {
            // Try to fix common JSON issues and retry
            let fixed = fix_json_issues(json_str);
            match serde_json::from_str(&fixed) {
                Ok(v) => v,
                Err(_) => match salvage_plan(json_str) {
                    Some(v) if !v.steps.is_empty() => v,
                    _ => {
                        let preview = truncate(json_str, 200);
                        return Err(anyhow::anyhow!(
                            "Plan could not be read ({}). Try again. Response preview: {}",
                            e,
                            preview
                        ));
                    }
                },
            }
        }
    };

    finish_plan(parsed)
}

fn finish_plan(parsed: PlanJson) -> anyhow::Result<RepairPlan> {
    let mut steps: Vec<RepairStep> = parsed
        .steps
        .into_iter()
        .filter(|s| !s.title.trim().is_empty())
        .map(|s| {
            let image_prompt = if s.image_prompt.trim().is_empty() {
                synthesize_image_prompt(&s.title, &s.description)
            } else {
                s.image_prompt
            };
            RepairStep {
                action: ActionKind::from_tag(&s.action),
                title: s.title,
                description: s.description,
                materials: s.materials,
                rationale: s.rationale,
                image_prompt,
            }
        })
        .collect();

    if steps.is_empty() {
        return Err(anyhow::anyhow!(
            "The plan came back without any usable steps. Try again."
        ));
    }
    steps.truncate(MAX_STEPS);

    Ok(RepairPlan {
        title: nonempty_or(parsed.title, "Repair Plan"),
        summary: parsed.summary,
        damage_report: parsed.damage_report,
        scrap_inventory: parsed.scrap_inventory,
        steps,
    })
}

fn nonempty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn synthesize_image_prompt(title: &str, description: &str) -> String {
    let detail = description.split('.').next().unwrap_or("").trim();
    if detail.is_empty() {
        title.to_string()
    } else {
        format!("{}: {}", title, detail)
    }
}

/// Strip markdown code fences from a response
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = if trimmed.starts_with("```json") {
        trimmed.strip_prefix("```json").unwrap_or(trimmed)
    } else if trimmed.starts_with("```") {
        trimmed.strip_prefix("```").unwrap_or(trimmed)
    } else {
        trimmed
    };
    let clean = if clean.ends_with("```") {
        clean.strip_suffix("```").unwrap_or(clean)
    } else {
        clean
    };
    clean.trim()
}

/// Extract a JSON fragment between matching delimiters
fn extract_json_fragment<'a>(text: &'a str, open: char, close: char) -> Option<&'a str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if start <= end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Try to fix common JSON issues from LLM responses
fn fix_json_issues(json: &str) -> String {
    let mut fixed = json.to_string();

    // Remove trailing commas before ] or }
    fixed = fixed.replace(",]", "]");
    fixed = fixed.replace(",}", "}");

    // Fix common quote issues - smart quotes to regular quotes
    fixed = fixed.replace('\u{201C}', "\""); // Left double quote
    fixed = fixed.replace('\u{201D}', "\""); // Right double quote
    fixed = fixed.replace('\u{2018}', "'"); // Left single quote
    fixed = fixed.replace('\u{2019}', "'"); // Right single quote

    // Remove any control characters that might have slipped in
    fixed = fixed
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    fixed
}

/// When the wrapper object won't parse as a whole, pull the header fields
/// out loosely and brace-scan the text for individually valid step objects.
fn salvage_plan(json: &str) -> Option<PlanJson> {
    let loose: serde_json::Value = serde_json::from_str(json).unwrap_or(serde_json::Value::Null);
    let field = |name: &str| -> String {
        loose
            .get(name)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    let steps = scan_step_objects(json);
    if steps.is_empty() {
        return None;
    }

    Some(PlanJson {
        title: field("title"),
        summary: field("summary"),
        damage_report: field("damage_report"),
        scrap_inventory: field("scrap_inventory"),
        steps,
    })
}

fn scan_step_objects(json: &str) -> Vec<StepJson> {
    let mut steps = Vec::new();
    let mut depth: i32 = 0;
    let mut start = None;

    for (i, c) in json.char_indices() {
        match c {
            '{' => {
                if depth == 1 || (depth == 0 && start.is_none()) {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    continue;
                }
                depth -= 1;
                if depth <= 1 {
                    if let Some(s) = start {
                        let obj_str = &json[s..=i];
                        if let Ok(step) = serde_json::from_str::<StepJson>(obj_str) {
                            if !step.title.trim().is_empty() {
                                steps.push(step);
                            }
                        }
                    }
                    start = None;
                }
            }
            _ => {}
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = r#"```json
{
  "title": "Wobbly Chair Revival",
  "summary": "Splint the cracked leg with the steel bracket and scrap pine.",
  "damage_report": "Rear left leg has a diagonal split near the seat joint.",
  "scrap_inventory": "Pine offcuts, steel L-bracket, wood screws, twine.",
  "steps": [
    {
      "title": "Clean the split",
      "description": "Brush dust and loose fibers out of the crack.",
      "materials": ["stiff brush"],
      "rationale": "Glue needs bare wood to bond.",
      "action": "clean",
      "image_prompt": "A hand brushing dust from a cracked wooden chair leg"
    },
    {
      "title": "Glue and clamp",
      "description": "Work glue into the split and clamp overnight.",
      "materials": ["wood glue", "clamp"],
      "rationale": "Restores most of the leg's strength.",
      "action": "join",
      "image_prompt": "A clamped wooden chair leg with glue squeeze-out"
    }
  ]
}
```"#;

    #[test]
    fn test_parse_full_plan() {
        let plan = parse_plan(FULL_RESPONSE).unwrap();
        assert_eq!(plan.title, "Wobbly Chair Revival");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].action, ActionKind::Clean);
        assert_eq!(plan.steps[1].materials, vec!["wood glue", "clamp"]);
    }

    #[test]
    fn test_parse_tolerates_trailing_commas_and_smart_quotes() {
        let messy = "{\u{201C}title\u{201D}: \"Fix\", \"summary\": \"s\", \"steps\": [{\"title\": \"Only step\", \"description\": \"d\", \"action\": \"cut\",},]}";
        let plan = parse_plan(messy).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action, ActionKind::Cut);
    }

    #[test]
    fn test_salvages_valid_steps_from_broken_array() {
        let broken = r#"{"title": "Partial", "summary": "s", "steps": [
            {"title": "Good one", "description": "works", "action": "measure"},
            {"title": "Broken one", "description": "unterminated
        ]}"#;
        let plan = parse_plan(broken).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].title, "Good one");
    }

    #[test]
    fn test_rejects_plan_without_steps() {
        let empty = r#"{"title": "Nothing", "summary": "no steps here", "steps": []}"#;
        let err = parse_plan(empty).unwrap_err();
        assert!(err.to_string().contains("steps"));
    }

    #[test]
    fn test_unknown_action_maps_to_improvise() {
        assert_eq!(ActionKind::from_tag("transmogrify"), ActionKind::Improvise);
        assert_eq!(ActionKind::from_tag("  GLUE "), ActionKind::Join);
    }

    #[test]
    fn test_step_cap() {
        let steps: Vec<String> = (0..15)
            .map(|i| format!(r#"{{"title": "Step {}", "description": "d", "action": "test"}}"#, i))
            .collect();
        let json = format!(
            r#"{{"title": "Long", "summary": "s", "steps": [{}]}}"#,
            steps.join(",")
        );
        let plan = parse_plan(&json).unwrap();
        assert_eq!(plan.steps.len(), MAX_STEPS);
    }

    #[test]
    fn test_missing_image_prompt_is_synthesized() {
        let json = r#"{"title": "T", "summary": "s", "steps": [
            {"title": "Sand the edge", "description": "Smooth the cut edge with coarse paper. Then finish fine.", "action": "shape"}
        ]}"#;
        let plan = parse_plan(json).unwrap();
        assert_eq!(
            plan.steps[0].image_prompt,
            "Sand the edge: Smooth the cut edge with coarse paper"
        );
    }

    #[test]
    fn test_steps_without_titles_are_dropped() {
        let json = r#"{"title": "T", "summary": "s", "steps": [
            {"title": "", "description": "ghost"},
            {"title": "Real", "description": "kept", "action": "inspect"}
        ]}"#;
        let plan = parse_plan(json).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].title, "Real");
    }

    #[test]
    fn test_chat_context_includes_numbered_steps() {
        let plan = parse_plan(FULL_RESPONSE).unwrap();
        let ctx = plan.to_chat_context();
        assert!(ctx.contains("REPAIR PLAN: Wobbly Chair Revival"));
        assert!(ctx.contains("1. Clean the split [clean]"));
        assert!(ctx.contains("2. Glue and clamp [join]"));
        assert!(ctx.contains("Materials: wood glue, clamp"));
    }
}
