pub const PLANNER_SYSTEM: &str = r#"You are the resident fixer at a scrappy neighborhood repair workshop. You are handed two photos: a broken object, and a pile of scrap materials. Your job is to design a practical, improvised repair using ONLY what is visible in the scrap pile plus bare hands and common hand tools.

OUTPUT FORMAT (JSON):
{
  "title": "Short, confident name for the repair",
  "summary": "2-3 sentences: what broke and how the scrap fixes it",
  "damage_report": "What you can see is wrong with the object, in plain words",
  "scrap_inventory": "What usable materials you can identify in the scrap photo",
  "steps": [
    {
      "title": "Imperative step name",
      "description": "2-4 sentences a non-expert can follow",
      "materials": ["items from the scrap pile used in this step"],
      "rationale": "One sentence on why this step matters",
      "action": "one of: inspect, clean, measure, cut, shape, join, fasten, seal, reinforce, test, finish, improvise",
      "image_prompt": "One sentence describing a photo-style illustration of this step being performed"
    }
  ]
}

CRITICAL RULES:
- Output ONLY the JSON object, no markdown fences, no commentary
- Use ONLY materials visible in the scrap photo - do not invent a hardware store
- 3 to 8 steps for most repairs, never more than 12
- Steps must be ordered: earlier steps prepare for later ones
- Every step gets exactly one action tag from the list above
- image_prompt describes the SCENE (hands, object, materials), never the camera or the model
- If the object is beyond repair with this scrap, say so in the summary and plan a partial fix
- Be honest in damage_report - do not soften what you see

TONE:
- Confident and resourceful, like a mechanic who has fixed worse with less
- Plain words over jargon
- Respect the object: the goal is a working fix, not a showroom restoration"#;

pub const PLANNER_TASK: &str = "The first photo is the broken object. The second photo is the scrap pile I have to work with. Design the repair.";

pub const ILLUSTRATION_STYLE: &str = "Warm workshop photograph, natural window light, shallow depth of field, hands working at a wooden bench. Scene: ";

pub const CHAT_SYSTEM_PREAMBLE: &str = r#"You are the workshop assistant for a repair project. The user has a generated repair plan (below) and is working through it.

RULES:
- Ground every answer in the plan below; refer to steps by number
- If the user asks about something outside this repair, gently steer back
- Practical, short answers; this is a workbench, not a lecture hall
- If a step looks risky for the user's situation, say so plainly
- Never claim the plan is guaranteed to work; it is a best effort from photos

"#;

/// Full system instruction for a plan-grounded chat session.
pub fn chat_system_instruction(plan_context: &str) -> String {
    format!("{}{}", CHAT_SYSTEM_PREAMBLE, plan_context)
}

/// Styled prompt for the primary illustration attempt.
pub fn styled_image_prompt(scene: &str) -> String {
    format!("{}{}", ILLUSTRATION_STYLE, scene)
}

/// Bare-bones prompt for fallback attempts: no style preamble, no scene
/// detail that could re-trip a filter, just the step in neutral words.
pub fn simplified_image_prompt(step_number: usize, step_title: &str) -> String {
    format!(
        "Simple instructional illustration of repair step {}: {}",
        step_number, step_title
    )
}

/// Spoken-style narration script for one step.
pub fn narration_script(step_number: usize, title: &str, description: &str, materials: &[String]) -> String {
    let mut script = format!("Step {}. {}. {}", step_number, title, description);
    if !materials.is_empty() && materials.len() <= 4 {
        script.push_str(&format!(" You will need: {}.", materials.join(", ")));
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_instruction_embeds_plan() {
        let instruction = chat_system_instruction("REPAIR PLAN: Test\nSteps:\n1. Only [test]");
        assert!(instruction.starts_with("You are the workshop assistant"));
        assert!(instruction.contains("REPAIR PLAN: Test"));
    }

    #[test]
    fn test_narration_script_mentions_materials_when_short() {
        let script = narration_script(2, "Glue the joint", "Spread glue evenly.", &[
            "wood glue".to_string(),
            "clamp".to_string(),
        ]);
        assert!(script.starts_with("Step 2. Glue the joint."));
        assert!(script.contains("You will need: wood glue, clamp."));
    }

    #[test]
    fn test_narration_script_skips_long_material_lists() {
        let materials: Vec<String> = (0..6).map(|i| format!("item {}", i)).collect();
        let script = narration_script(1, "Sort the pile", "Lay everything out.", &materials);
        assert!(!script.contains("You will need"));
    }

    #[test]
    fn test_prompt_builders() {
        assert!(styled_image_prompt("a clamped chair leg").ends_with("Scene: a clamped chair leg"));
        let simple = simplified_image_prompt(3, "Fit the brace");
        assert_eq!(
            simple,
            "Simple instructional illustration of repair step 3: Fit the brace"
        );
    }
}
