//! The demo workshop: a complete canned repair that bypasses the network.
//!
//! Also home to the blueprint renderer, which doubles as the terminal
//! rung of the illustration fallback chain. Blueprint images are
//! deterministic per step so reruns and tests see identical bytes.

use crate::plan::{ActionKind, RepairPlan, RepairStep};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::io::Cursor;

pub const DEMO_CHAT_NOTICE: &str = "The demo workshop is offline, so there is no assistant to ask. \
     Everything else here is the real interface walking a canned plan. \
     Add an API key with 'scrapsmith --setup' to chat about a live repair.";

const BLUEPRINT_W: u32 = 640;
const BLUEPRINT_H: u32 = 400;

/// Draw a blueprint-style placeholder PNG for one step: tinted blue
/// field, drafting grid, cross-hatched center panel, and a tally of the
/// step number in the corner.
pub fn blueprint_png(step_index: usize, title: &str) -> Vec<u8> {
    let digest = {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update((step_index as u64).to_be_bytes());
        hasher.finalize()
    };

    // Always lands somewhere in drafting-paper blue
    let base = Rgb([
        16 + digest[0] % 24,
        40 + digest[1] % 24,
        96 + digest[2] % 48,
    ]);
    let grid = lighten(base, 24);
    let ink = Rgb([214, 226, 240]);

    let mut img = RgbImage::from_pixel(BLUEPRINT_W, BLUEPRINT_H, base);

    // Drafting grid
    for x in (0..BLUEPRINT_W).step_by(32) {
        for y in 0..BLUEPRINT_H {
            img.put_pixel(x, y, grid);
        }
    }
    for y in (0..BLUEPRINT_H).step_by(32) {
        for x in 0..BLUEPRINT_W {
            img.put_pixel(x, y, grid);
        }
    }

    // Cross-hatched center panel where the illustration would sit
    let (px0, py0, px1, py1) = (96u32, 64u32, BLUEPRINT_W - 96, BLUEPRINT_H - 96);
    for y in py0..py1 {
        for x in px0..px1 {
            let on_edge = x == px0 || x == px1 - 1 || y == py0 || y == py1 - 1;
            let on_hatch = (x + y) % 24 == 0;
            if on_edge || on_hatch {
                img.put_pixel(x, y, ink);
            }
        }
    }

    // Border
    for x in 0..BLUEPRINT_W {
        for y in [0, 1, BLUEPRINT_H - 2, BLUEPRINT_H - 1] {
            img.put_pixel(x, y, ink);
        }
    }
    for y in 0..BLUEPRINT_H {
        for x in [0, 1, BLUEPRINT_W - 2, BLUEPRINT_W - 1] {
            img.put_pixel(x, y, ink);
        }
    }

    // Step tally in the top-left margin
    let marks = (step_index + 1).min(12) as u32;
    for mark in 0..marks {
        let x0 = 16 + mark * 10;
        for dy in 0..24u32 {
            for dx in 0..4u32 {
                img.put_pixel(x0 + dx, 16 + dy, ink);
            }
        }
    }

    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    // Encoding into a Vec cannot fail in practice
    let _ = DynamicImage::ImageRgb8(img).write_to(&mut cursor, ImageFormat::Png);
    bytes
}

fn lighten(color: Rgb<u8>, amount: u8) -> Rgb<u8> {
    Rgb([
        color[0].saturating_add(amount),
        color[1].saturating_add(amount),
        color[2].saturating_add(amount),
    ])
}

/// The canned plan: a split chair leg fixed from a believable scrap pile.
pub fn demo_plan() -> RepairPlan {
    let step = |title: &str,
                description: &str,
                materials: &[&str],
                rationale: &str,
                action: ActionKind,
                image_prompt: &str| RepairStep {
        title: title.to_string(),
        description: description.to_string(),
        materials: materials.iter().map(|m| m.to_string()).collect(),
        rationale: rationale.to_string(),
        action,
        image_prompt: image_prompt.to_string(),
    };

    RepairPlan {
        title: "Split Chair Leg, Splinted and Braced".to_string(),
        summary: "The rear leg has a long diagonal split but both halves are intact. \
                  Glue rebuilds the joint, a pine splint carries the load, and the \
                  steel bracket backs it all up at the seat rail."
            .to_string(),
        damage_report: "Rear left leg split diagonally about 12 cm below the seat, \
                        likely from a sideways drop. The split runs with the grain \
                        and the pieces still mate cleanly. Seat rail joint is loose \
                        but undamaged."
            .to_string(),
        scrap_inventory: "Pine offcuts (one roughly 3 x 30 cm), a steel L-bracket \
                          with four holes, assorted wood screws, half a roll of \
                          twine, wood glue, sandpaper scraps."
            .to_string(),
        steps: vec![
            step(
                "Sort the pile",
                "Lay the scrap out in rows on the bench. Set aside the long pine \
                 offcut, the L-bracket, four matching screws, the twine, and the glue.",
                &["pine offcut", "L-bracket", "wood screws", "twine", "wood glue"],
                "Knowing what you have decides the whole repair.",
                ActionKind::Inspect,
                "Scrap wood, a steel bracket, screws and twine laid out in neat rows on a workbench",
            ),
            step(
                "Clean the split",
                "Brush dust and splinters out of the crack. Dry-fit the two halves \
                 until they close with light hand pressure.",
                &["stiff brush"],
                "Glue bonds bare wood, not dust.",
                ActionKind::Clean,
                "Hands brushing debris out of a long split in a wooden chair leg",
            ),
            step(
                "Glue and bind the crack",
                "Work glue deep into the split, close it, then wrap the leg tightly \
                 with twine from below the crack to above it. Wipe squeeze-out and \
                 leave it overnight.",
                &["wood glue", "twine"],
                "The twine wrap is the clamp you do not own.",
                ActionKind::Join,
                "A wooden chair leg wrapped in tight twine spirals with glue squeeze-out",
            ),
            step(
                "Cut the pine splint",
                "Cut the pine offcut to span a hand-width past the crack in both \
                 directions. Sand one face flat so it sits flush on the leg.",
                &["pine offcut", "sandpaper"],
                "A splint only works when it bridges well past the break.",
                ActionKind::Cut,
                "Sawing a thin pine strip to length on a workbench, pencil marks visible",
            ),
            step(
                "Screw the splint home",
                "After the glue cures, remove the twine. Screw the splint across the \
                 repaired split with two screws either side of the crack line.",
                &["pine splint", "wood screws"],
                "Screws carry the shear the glue line cannot.",
                ActionKind::Fasten,
                "Driving screws through a pine splint fixed along a repaired chair leg",
            ),
            step(
                "Brace the seat rail",
                "Seat the L-bracket into the corner where the leg meets the rail and \
                 drive the remaining screws. Snug, not crushing.",
                &["L-bracket", "wood screws"],
                "The bracket stops the joint working loose again.",
                ActionKind::Reinforce,
                "A steel L-bracket screwed into the corner joint of a wooden chair frame",
            ),
            step(
                "Load it gently",
                "Set the chair on level floor and lean weight onto the seat gradually. \
                 Listen for creaks at the splint; re-drive any screw that shifts.",
                &[],
                "Finding a weak screw now beats finding it mid-sit.",
                ActionKind::Test,
                "Two hands pressing down on a repaired wooden chair seat in a workshop",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::MAX_STEPS;

    #[test]
    fn test_demo_plan_is_well_formed() {
        let plan = demo_plan();
        assert!(!plan.title.is_empty());
        assert!(plan.steps.len() >= 3 && plan.steps.len() <= MAX_STEPS);
        for step in &plan.steps {
            assert!(!step.title.is_empty());
            assert!(!step.description.is_empty());
            assert!(!step.image_prompt.is_empty());
        }
    }

    #[test]
    fn test_blueprint_png_is_deterministic() {
        let a = blueprint_png(2, "Glue and bind the crack");
        let b = blueprint_png(2, "Glue and bind the crack");
        assert_eq!(a, b);

        let other_step = blueprint_png(3, "Glue and bind the crack");
        assert_ne!(a, other_step);
    }

    #[test]
    fn test_blueprint_png_decodes() {
        let bytes = blueprint_png(0, "Sort the pile");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 640);
        assert_eq!(decoded.height(), 400);
    }
}
