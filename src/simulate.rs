//! Simulated view renderer
//!
//! A deterministic three-level traversal (tiles → items → features) drawn
//! through the engine, plus the update driver that re-enters it:
//!
//! - draw the newest frame
//! - pop it when it completed or caught up with the frame below
//! - return as soon as the trigger reports a suspension
//!
//! Used by the `resumable simulate` command and by tests that compare
//! interrupted runs with uninterrupted ones.

use std::rc::Rc;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::engine::{BreakCause, CounterStacks, ResumableCounter};
use crate::error::EngineError;
use crate::geometry::{Point, Rect, Region};
use crate::trigger::SuspendTrigger;

/* ===================== Scene ===================== */

/// Grid of square tiles, each holding `items` items of `features` features.
#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub columns: usize,
    pub rows: usize,
    pub tile_size: i32,
    pub items: usize,
    pub features: usize,
    /// Features between two oracle checks (a power of two).
    pub sample_period: usize,
}

impl Scene {
    pub fn tile_count(&self) -> usize {
        self.columns * self.rows
    }

    pub fn tile_rect(&self, tile: usize) -> Rect {
        let col = (tile % self.columns) as i32;
        let row = (tile / self.columns) as i32;
        Rect::new(
            col * self.tile_size,
            row * self.tile_size,
            (col + 1) * self.tile_size,
            (row + 1) * self.tile_size,
        )
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(Point::new(
            self.columns as i32 * self.tile_size,
            self.rows as i32 * self.tile_size,
        ))
    }

    /// Strokes an uninterrupted full draw produces.
    pub fn stroke_count(&self) -> usize {
        self.tile_count() * self.items * self.features
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Stroke {
    pub tile: usize,
    pub item: usize,
    pub feature: usize,
}

/// Result of one traversal step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Break,
}

/* ===================== Traversal ===================== */

/// Draw the tiles of the current frame that intersect its region.
pub fn draw_scene(
    scene: &Scene,
    stacks: &mut CounterStacks<Region>,
    strokes: &mut Vec<Stroke>,
) -> Result<Flow, EngineError> {
    let region = stacks.curr_payload().cloned().unwrap_or_default();

    let mut tiles = ResumableCounter::open(stacks, false)?;
    if tiles.must_break_or_suspend() {
        return Ok(Flow::Break);
    }

    while tiles.value() < scene.tile_count() {
        let tile = tiles.value();
        if region.intersects(&scene.tile_rect(tile))
            && draw_items(scene, tile, &mut tiles, strokes) == Flow::Break
        {
            return Ok(Flow::Break);
        }
        if !tiles.inc() {
            return Ok(Flow::Break);
        }
    }
    tiles.close();
    Ok(Flow::Continue)
}

fn draw_items(
    scene: &Scene,
    tile: usize,
    parent: &mut ResumableCounter<'_, Region>,
    strokes: &mut Vec<Stroke>,
) -> Flow {
    let mut items = parent.nest(false);
    if items.must_break_or_suspend() {
        return Flow::Break;
    }

    while items.value() < scene.items {
        let item = items.value();
        if draw_features(scene, tile, item, &mut items, strokes) == Flow::Break {
            return Flow::Break;
        }
        if !items.inc() {
            return Flow::Break;
        }
    }
    items.close();
    Flow::Continue
}

fn draw_features(
    scene: &Scene,
    tile: usize,
    item: usize,
    parent: &mut ResumableCounter<'_, Region>,
    strokes: &mut Vec<Stroke>,
) -> Flow {
    let mut features = parent.nest(true);

    while features.value() < scene.features {
        if features.must_break() || features.must_break_or_suspend_every(scene.sample_period) {
            return Flow::Break;
        }
        strokes.push(Stroke {
            tile,
            item,
            feature: features.value(),
        });
        features.increment();
    }
    features.close();
    Flow::Continue
}

/* ===================== Update Driver ===================== */

/// Outcome of [`Renderer::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Update {
    /// All pending work was drawn.
    Done,
    /// The trigger asked to yield; call `update()` again to resume.
    Suspended,
    /// The pass was broken; pending work was reset to the whole scene.
    Restarted,
    /// The pass exceeded the configured nesting depth and was abandoned.
    Aborted,
}

#[derive(Debug)]
pub struct Renderer {
    scene: Scene,
    stacks: CounterStacks<Region>,
    trigger: Rc<SuspendTrigger>,
    strokes: Vec<Stroke>,
    updates: usize,
}

impl Renderer {
    /// Create a renderer with the whole scene pending.
    pub fn new(scene: Scene, config: EngineConfig, trigger: Rc<SuspendTrigger>) -> Self {
        let mut stacks = CounterStacks::with_oracle(config, trigger.clone());
        stacks.reset(Region::from(scene.bounds()));
        Self {
            scene,
            stacks,
            trigger,
            strokes: Vec::new(),
            updates: 0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn stacks(&self) -> &CounterStacks<Region> {
        &self.stacks
    }

    pub fn trigger(&self) -> &SuspendTrigger {
        &self.trigger
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn is_done(&self) -> bool {
        self.stacks.empty()
    }

    /// Mark `rect` as needing a redraw.
    pub fn invalidate(&mut self, rect: Rect) {
        self.stacks.invalidate(Region::from(rect));
    }

    /// Draw until all pending work is done or the trigger suspends.
    pub fn update(&mut self) -> Result<Update, EngineError> {
        self.trigger.resume();
        self.updates += 1;

        while !self.stacks.empty() {
            let flow = draw_scene(&self.scene, &mut self.stacks, &mut self.strokes)?;

            match self.stacks.break_cause() {
                Some(BreakCause::CaughtUp) => {
                    self.stacks.pop_back();
                }
                Some(BreakCause::Requested) => {
                    tracing::info!(update = self.updates, "pass broken on request; redrawing everything");
                    self.stacks.reset(Region::from(self.scene.bounds()));
                    return Ok(Update::Restarted);
                }
                Some(BreakCause::DepthExceeded) => {
                    tracing::warn!(update = self.updates, "pass abandoned: nesting too deep");
                    self.stacks.reset(Region::from(self.scene.bounds()));
                    return Ok(Update::Aborted);
                }
                None if flow == Flow::Continue => {
                    self.stacks.pop_back();
                }
                None => {}
            }

            if self.trigger.did_suspend() {
                tracing::debug!(
                    update = self.updates,
                    slots = ?self.stacks.slots(),
                    "update suspended"
                );
                return Ok(Update::Suspended);
            }
        }
        Ok(Update::Done)
    }

    /// Call `update()` until the scene is drawn or `max_updates` is reached.
    pub fn run_to_completion(&mut self, max_updates: usize) -> Result<RunReport, EngineError> {
        let mut report = RunReport::default();

        while report.updates < max_updates {
            report.updates += 1;
            match self.update()? {
                Update::Done => {
                    report.complete = true;
                    break;
                }
                Update::Suspended => report.suspensions += 1,
                Update::Restarted => report.restarts += 1,
                Update::Aborted => {
                    report.aborted = true;
                    break;
                }
            }
        }

        report.strokes = self.strokes.len();
        report.unique_strokes = {
            let mut unique = self.strokes.clone();
            unique.sort_unstable();
            unique.dedup();
            unique.len()
        };
        tracing::info!(
            updates = report.updates,
            suspensions = report.suspensions,
            strokes = report.strokes,
            complete = report.complete,
            "simulation finished"
        );
        Ok(report)
    }
}

/// Summary of [`Renderer::run_to_completion`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub updates: usize,
    pub suspensions: usize,
    pub restarts: usize,
    pub strokes: usize,
    pub unique_strokes: usize,
    pub complete: bool,
    pub aborted: bool,
}
