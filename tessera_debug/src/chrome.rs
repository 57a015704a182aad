// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Recordings carry no wall-clock time, so every event is placed one
//! microsecond after the previous one. The viewer then shows the pipeline
//! shape and relative event counts, not durations.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use tessera_core::trace::CacheAction;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes)
        .enumerate()
        .map(|(ts, recorded)| to_trace_event(ts, recorded))
        .collect();

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn instant(ts: usize, name: &str, cat: &str, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ts,
        "pid": 0,
        "tid": 0,
        "s": "t",
        "args": args,
    })
}

fn to_trace_event(ts: usize, recorded: RecordedEvent) -> Value {
    match recorded {
        RecordedEvent::PhaseBegin(e) => json!({
            "ph": "B",
            "name": e.phase.label(),
            "cat": "Frame",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": { "frame_index": e.frame_index },
        }),
        RecordedEvent::PhaseEnd(e) => json!({
            "ph": "E",
            "name": e.phase.label(),
            "cat": "Frame",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": { "frame_index": e.frame_index },
        }),
        RecordedEvent::DirtyRegions(e) => instant(
            ts,
            "DirtyRegions",
            "Frame",
            json!({
                "frame_index": e.frame_index,
                "region_count": e.region_count,
                "full_repaint": e.full_repaint,
            }),
        ),
        RecordedEvent::RenderRoot(e) => instant(
            ts,
            "RenderRoot",
            "Occlusion",
            json!({
                "frame_index": e.frame_index,
                "region_index": e.region_index,
                "result": format!("{:?}", e.result),
                "node_index": e.node_index,
                "depth": e.depth,
            }),
        ),
        RecordedEvent::Cache(e) => {
            let mut args = json!({
                "frame_index": e.frame_index,
                "node_index": e.node_index,
            });
            let action = match e.action {
                CacheAction::Regenerated { width, height } => {
                    args["width"] = json!(width);
                    args["height"] = json!(height);
                    "Regenerated"
                }
                CacheAction::Reused => "Reused",
                CacheAction::Scrolled { dx, dy } => {
                    args["dx"] = json!(dx);
                    args["dy"] = json!(dy);
                    "Scrolled"
                }
                CacheAction::Fallback => "Fallback",
            };
            args["action"] = json!(action);
            instant(ts, "Cache", "Cache", args)
        }
        RecordedEvent::FrameSummary(s) => json!({
            "ph": "i",
            "name": "FrameSummary",
            "cat": "Summary",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "s": "g",
            "args": {
                "frame_index": s.frame_index,
                "region_count": s.region_count,
                "full_repaint": s.full_repaint,
                "render_roots": s.render_roots,
                "regions_skipped": s.regions_skipped,
                "nodes_painted": s.nodes_painted,
                "caches_regenerated": s.caches_regenerated,
                "caches_reused": s.caches_reused,
                "caches_scrolled": s.caches_scrolled,
                "cache_fallbacks": s.cache_fallbacks,
            }
        }),
        RecordedEvent::DirtyRectsCount { frame_index, count } => instant(
            ts,
            "DirtyRects",
            "Rich",
            json!({ "frame_index": frame_index, "count": count }),
        ),
        RecordedEvent::NodePainted {
            frame_index,
            node_index,
        } => instant(
            ts,
            "NodePainted",
            "Rich",
            json!({ "frame_index": frame_index, "node_index": node_index }),
        ),
    }
}
