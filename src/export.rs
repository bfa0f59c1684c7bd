//! Self-contained HTML export of a finished session.
//!
//! Images are inlined as data URIs so the file survives being mailed or
//! moved on its own. Narration stays on disk next to it; the export
//! links it by relative name.

use crate::media::InlineImage;
use crate::plan::{RepairPlan, RepairStep};
use crate::session::Session;
use crate::util::format_clock;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Render `export.html` into the session directory.
pub fn export_html(session: &Session, plan: &RepairPlan) -> Result<PathBuf> {
    let mut cards = String::new();
    for (i, step) in plan.steps.iter().enumerate() {
        let image_src = read_image_data_url(session, i);
        let narration = narration_note(session, i);
        cards.push_str(&step_card(i, step, image_src, narration));
    }

    let out_path = session.export_path();
    let html_doc = document(plan, &cards);
    fs::write(&out_path, html_doc)
        .with_context(|| format!("Could not write {}", out_path.display()))?;
    Ok(out_path)
}

fn read_image_data_url(session: &Session, step_index: usize) -> Option<String> {
    let path = session.image_path(step_index);
    let data = fs::read(&path).ok()?;
    let image = InlineImage {
        mime: "image/png".to_string(),
        data,
    };
    Some(image.to_data_url())
}

fn narration_note(session: &Session, step_index: usize) -> Option<String> {
    let path = session.narration_path(step_index);
    let reader = hound::WavReader::open(&path).ok()?;
    let spec = reader.spec();
    let secs = reader.duration() as f64 / spec.sample_rate.max(1) as f64;
    let name = path.file_name()?.to_string_lossy().into_owned();
    Some(format!("{} ({})", name, format_clock(secs)))
}

fn step_card(
    step_index: usize,
    step: &RepairStep,
    image_src: Option<String>,
    narration: Option<String>,
) -> String {
    let figure = match image_src {
        Some(src) => format!("<img src='{}' alt='step illustration'>", src),
        None => "<div class='noimg'>no illustration</div>".to_string(),
    };
    let materials = if step.materials.is_empty() {
        String::new()
    } else {
        let items: String = step
            .materials
            .iter()
            .map(|m| format!("<li>{}</li>", escape_html(m)))
            .collect();
        format!("<ul class='materials'>{}</ul>", items)
    };
    let audio_line = narration
        .map(|note| format!("<div class='audio'>narration: {}</div>", escape_html(&note)))
        .unwrap_or_default();

    format!(
        "<div class='step'><div class='head'><span class='num'>{num}</span><h2>{title}</h2><span class='tag'>{tag}</span></div><div class='figure'>{figure}</div><p class='desc'>{desc}</p>{materials}<p class='why'>{why}</p>{audio}</div>",
        num = step_index + 1,
        title = escape_html(&step.title),
        tag = escape_html(step.action.label()),
        figure = figure,
        desc = escape_html(&step.description),
        materials = materials,
        why = escape_html(&step.rationale),
        audio = audio_line,
    )
}

fn document(plan: &RepairPlan, cards: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n  <meta charset='utf-8'>\n  <title>{title}</title>\n  <style>\n    body {{ font-family: Georgia, serif; background: #f4f1ea; color: #2a2723; margin: 0; padding: 32px; max-width: 880px; margin-left: auto; margin-right: auto; }}\n    h1 {{ margin-bottom: 4px; }}\n    .summary {{ font-size: 17px; color: #53493c; }}\n    .reports {{ display: grid; grid-template-columns: 1fr 1fr; gap: 16px; margin: 24px 0; }}\n    .report {{ background: #fffdf8; border: 1px solid #d9d2c4; border-radius: 8px; padding: 14px; font-size: 14px; }}\n    .report h3 {{ margin: 0 0 8px 0; font-size: 13px; text-transform: uppercase; letter-spacing: 1px; color: #8a7d68; }}\n    .step {{ background: #fffdf8; border: 1px solid #d9d2c4; border-radius: 10px; padding: 18px; margin-bottom: 20px; page-break-inside: avoid; }}\n    .head {{ display: flex; align-items: baseline; gap: 12px; }}\n    .num {{ font-size: 22px; font-weight: bold; color: #a3552c; }}\n    .head h2 {{ margin: 0; font-size: 19px; flex: 1; }}\n    .tag {{ font-size: 12px; background: #ece4d4; border-radius: 10px; padding: 2px 10px; color: #6b5d47; }}\n    .figure img {{ max-width: 100%; border-radius: 6px; margin: 12px 0; }}\n    .noimg {{ height: 120px; display: flex; align-items: center; justify-content: center; background: #ece7db; color: #9a8e7a; border-radius: 6px; margin: 12px 0; }}\n    .materials {{ font-size: 14px; }}\n    .why {{ font-style: italic; color: #6b5d47; font-size: 14px; }}\n    .audio {{ font-size: 12px; color: #8a7d68; }}\n    footer {{ margin-top: 32px; font-size: 12px; color: #9a8e7a; text-align: center; }}\n    @media print {{ body {{ background: white; padding: 0; }} .step {{ border: 1px solid #ccc; }} }}\n  </style>\n</head>\n<body>\n  <h1>{title}</h1>\n  <p class='summary'>{summary}</p>\n  <div class='reports'>\n    <div class='report'><h3>Damage</h3>{damage}</div>\n    <div class='report'><h3>Scrap on hand</h3>{scrap}</div>\n  </div>\n  {cards}\n  <footer>assembled by scrapsmith</footer>\n</body>\n</html>\n",
        title = escape_html(&plan.title),
        summary = escape_html(&plan.summary),
        damage = escape_html(&plan.damage_report),
        scrap = escape_html(&plan.scrap_inventory),
        cards = cards,
    )
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{blueprint_png, demo_plan};

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">glue & clamp</a>"#),
            "&lt;a href=&quot;x&quot;&gt;glue &amp; clamp&lt;/a&gt;"
        );
    }

    #[test]
    fn test_export_embeds_images_and_steps() {
        let temp = tempfile::tempdir().unwrap();
        let session = Session::create(Some(temp.path()), "t").unwrap();
        let plan = demo_plan();

        // Two of the steps have images on disk, the rest do not
        session
            .write_step_image(0, &blueprint_png(0, &plan.steps[0].title))
            .unwrap();
        session
            .write_step_image(1, &blueprint_png(1, &plan.steps[1].title))
            .unwrap();

        let out = export_html(&session, &plan).unwrap();
        let html = fs::read_to_string(&out).unwrap();

        assert!(html.contains("Split Chair Leg, Splinted and Braced"));
        assert_eq!(html.matches("class='step'").count(), plan.steps.len());
        assert_eq!(html.matches("data:image/png;base64,").count(), 2);
        assert!(html.contains("class='noimg'"));
        assert!(html.contains("L-bracket"));
    }

    #[test]
    fn test_export_notes_narration_when_present() {
        let temp = tempfile::tempdir().unwrap();
        let session = Session::create(Some(temp.path()), "t").unwrap();
        let plan = demo_plan();

        let samples = vec![0i16; 24_000];
        session.write_narration(0, &samples, 24_000).unwrap();

        let out = export_html(&session, &plan).unwrap();
        let html = fs::read_to_string(&out).unwrap();
        assert!(html.contains("step-01.wav (0:01)"));
    }

    #[test]
    fn test_step_card_escapes_content() {
        let plan = demo_plan();
        let mut step = plan.steps[0].clone();
        step.title = "Cut & paste <fast>".to_string();
        let card = step_card(0, &step, None, None);
        assert!(card.contains("Cut &amp; paste &lt;fast&gt;"));
        assert!(!card.contains("<fast>"));
    }
}
