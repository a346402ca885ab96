// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Headless demo session: registers mock shapes, drives draw/select callbacks
//! the way a host would, and tabulates what the engine did.

use std::rc::Rc;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use shapebatch_core::{
    BatchConfig, BatchRenderer, DrawEvent, DrawOutcome, EndOfPass, SelectEvent, SelectOutcome,
};
use shapebatch_mock::{MockBackend, MockShape};
use shapebatch_port::{
    AdapterId, CameraMatrices, FixedCapabilities, FrameStamp, Hit, PassId, RenderParamsKey,
    ViewportContext, ViewportRect,
};
use tracing::info;

use crate::DemoArgs;

/// Rendered tables for one demo run.
pub struct Summary {
    /// One row per bucket after the last frame.
    pub buckets: Table,
    /// One row per frame.
    pub frames: Table,
}

/// Run a demo session.
pub fn run(config: BatchConfig, args: &DemoArgs) -> Result<Summary> {
    let context = ViewportContext::from(args.context);
    let end_of_pass = config.context(context).end_of_pass;
    let host = FixedCapabilities {
        depth_selection: args.depth_selection,
    };
    let mut renderer = BatchRenderer::new(config, MockBackend::new(), host)?;
    let shapes = populate(&mut renderer, context, args)?;
    info!(%context, shapes = shapes.len(), "demo session populated");

    let viewport = ViewportRect::sized(1280, 720);
    let mut frames = Table::new();
    frames.load_preset(UTF8_FULL).set_header(vec![
        "frame",
        "draw",
        "repeat draw",
        "select",
        "repeat select",
        "cached hits",
    ]);

    for frame in 1..=args.frames {
        renderer.on_render_requested(context);
        // Every other frame the host flips one shape's display mode.
        if frame > 1 && frame % 2 == 0 {
            if let Some(shape) = shapes.first() {
                let refine = u8::try_from(frame % 4)?;
                shape.set_params(RenderParamsKey::lit().with_refine_level(refine));
                renderer.refresh_adapter(context, AdapterId(1))?;
            }
        }

        let draw = DrawEvent {
            stamp: Some(FrameStamp(frame)),
            // Only Viewport 2.0 hosts name their passes.
            pass_id: (context == ViewportContext::Viewport2).then(|| PassId::new("beauty")),
            camera: CameraMatrices::default(),
            viewport,
        };
        let first = renderer.on_draw(context, &draw)?;
        let repeat = renderer.on_draw(context, &draw)?;
        if end_of_pass == EndOfPass::Native {
            renderer.on_end_of_pass(context)?;
        }

        let select = SelectEvent {
            stamp: Some(FrameStamp(frame)),
            camera: CameraMatrices::default(),
            viewport,
            single_selection: args.single,
        };
        let picked = renderer.on_select(context, &select)?;
        let repicked = renderer.on_select(context, &select)?;

        frames.add_row(vec![
            frame.to_string(),
            describe_draw(first),
            describe_draw(repeat),
            describe_select(picked),
            describe_select(repicked),
            renderer.selection().hit_count().to_string(),
        ]);
    }

    let mut buckets = Table::new();
    buckets
        .load_preset(UTF8_FULL)
        .set_header(vec!["digest", "shading", "refine", "adapters"]);
    for bucket in renderer.registry().context(context).buckets() {
        let key = bucket.key();
        buckets.add_row(vec![
            bucket.digest().short(),
            format!("{:?}", key.shading),
            key.refine_level.to_string(),
            bucket
                .ids()
                .map(|id| id.0.to_string())
                .collect::<Vec<_>>()
                .join(","),
        ]);
    }

    Ok(Summary { buckets, frames })
}

fn populate(
    renderer: &mut BatchRenderer<MockBackend>,
    context: ViewportContext,
    args: &DemoArgs,
) -> Result<Vec<Rc<MockShape>>> {
    let mut shapes = Vec::with_capacity(usize::from(args.shapes));
    for i in 0..args.shapes {
        let id = AdapterId(u64::from(i) + 1);
        let variant = u8::try_from(i % u16::from(args.variants))?;
        let path = format!("/World/shape_{i}");
        let shape = MockShape::new(
            id,
            context,
            RenderParamsKey::lit().with_refine_level(variant),
            path.as_str(),
        )
        .shared();
        renderer.register_adapter(shape.clone())?;
        let depth = f32::from(i + 1) / (f32::from(args.shapes) + 1.0);
        renderer
            .backend_mut()
            .add_hit(Hit::new(id, format!("{path}/mesh"), depth));
        shapes.push(shape);
    }
    Ok(shapes)
}

fn describe_draw(outcome: DrawOutcome) -> String {
    match outcome {
        DrawOutcome::Rendered { items } => format!("rendered {items} items"),
        DrawOutcome::Deduplicated => "deduplicated".to_owned(),
    }
}

fn describe_select(outcome: SelectOutcome) -> String {
    match outcome {
        SelectOutcome::Computed(report) => format!(
            "{:?}: {} queries, {} hits",
            report.mode, report.queries, report.hits
        ),
        SelectOutcome::Cached => "cached".to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ContextArg;

    fn args(context: ContextArg) -> DemoArgs {
        DemoArgs {
            context,
            shapes: 6,
            variants: 2,
            frames: 3,
            depth_selection: Some(true),
            single: false,
        }
    }

    fn column(table: &Table, index: usize) -> Vec<String> {
        table
            .row_iter()
            .filter_map(|row| row.cell_iter().nth(index).map(comfy_table::Cell::content))
            .collect()
    }

    #[test]
    fn viewport2_session_tabulates_every_frame() {
        let summary = run(BatchConfig::default(), &args(ContextArg::Viewport2)).unwrap();
        assert_eq!(summary.frames.row_count(), 3);
        assert!(summary.buckets.row_count() >= 2);
    }

    #[test]
    fn legacy_session_draws_once_per_frame() {
        let summary = run(BatchConfig::default(), &args(ContextArg::Legacy)).unwrap();
        assert_eq!(summary.frames.row_count(), 3);
        for draw in column(&summary.frames, 1) {
            assert!(draw.starts_with("rendered"), "{draw}");
        }
        assert!(column(&summary.frames, 2).iter().all(|d| d == "deduplicated"));
    }

    #[test]
    fn legacy_session_with_native_end_of_pass() {
        let mut config = BatchConfig::default();
        config.legacy.end_of_pass = EndOfPass::Native;
        let summary = run(config, &args(ContextArg::Legacy)).unwrap();
        assert!(column(&summary.frames, 4).iter().all(|s| s == "cached"));
    }
}
