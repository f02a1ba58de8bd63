//! Effect processor lifecycle and the per-channel pipeline.
//!
//! Every effect of the current division gets an [`ActiveEffect`]. The
//! pipeline keeps them sorted by [`Priority`] so note and instrument changes
//! land before anything that reads or modulates the channel state.
//!
//! ```text
//! NotStarted --on_effect_start--> Active --on_effect_end--> Ended
//! ```
//!
//! [`Scope::Single`] effects end right after their first update, at the
//! division start. [`Scope::Division`] effects stay active until the next
//! division begins.

use crate::score::{DivisionChannel, EffectKind, Module};

use super::channel::ChannelPlaybackState;
use super::processors::Processor;
use super::sequencer::GlobalPlaybackState;

/// Execution order within a division; lower runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Note and instrument triggers
    Trigger = 0,
    /// One-shot parameter changes
    Set = 1,
    /// Slides and oscillators
    Modulate = 2,
}

impl Priority {
    /// Priority tier of an effect kind
    pub fn of(kind: EffectKind) -> Self {
        match kind {
            EffectKind::SetPitch | EffectKind::SetSample => Priority::Trigger,
            EffectKind::PeriodSlide
            | EffectKind::Arpeggio
            | EffectKind::VolumeSlide
            | EffectKind::Waveform => Priority::Modulate,
            _ => Priority::Set,
        }
    }
}

/// How long a processor stays active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Applied once at the division start
    Single,
    /// Updated on every output sample of the division
    Division,
}

/// Processor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Not yet started
    #[default]
    NotStarted,
    /// Started and receiving updates
    Active,
    /// Finished; receives no further calls
    Ended,
}

/// State an effect processor may read and modify.
pub struct ProcessorContext<'a> {
    /// The processor's channel
    pub channel: &'a mut ChannelPlaybackState,
    /// Shared song state
    pub global: &'a mut GlobalPlaybackState,
    /// Module being played
    pub module: &'a Module,
}

/// Runtime behaviour of one effect.
pub trait EffectProcessor {
    /// Lifetime of the processor
    fn scope(&self) -> Scope {
        Scope::Division
    }

    /// Called once before the first update.
    fn on_effect_start(&mut self, _ctx: &mut ProcessorContext<'_>) {}

    /// Called on every output sample while active.
    fn on_process(&mut self, ctx: &mut ProcessorContext<'_>, tick_changed: bool);

    /// Called once when the processor is retired.
    fn on_effect_end(&mut self, _ctx: &mut ProcessorContext<'_>) {}
}

/// A processor plus its lifecycle bookkeeping.
#[derive(Debug, Clone)]
pub struct ActiveEffect {
    processor: Processor,
    priority: Priority,
    lifecycle: Lifecycle,
}

impl ActiveEffect {
    /// Wrap a processor with its priority.
    pub fn new(processor: Processor, priority: Priority) -> Self {
        Self {
            processor,
            priority,
            lifecycle: Lifecycle::NotStarted,
        }
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Execution priority
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Wrapped processor
    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Start if needed, then process.
    pub fn update(&mut self, ctx: &mut ProcessorContext<'_>, tick_changed: bool) {
        if self.lifecycle == Lifecycle::NotStarted {
            self.processor.on_effect_start(ctx);
            self.lifecycle = Lifecycle::Active;
        }
        if self.lifecycle == Lifecycle::Active {
            self.processor.on_process(ctx, tick_changed);
        }
    }

    /// Retire the processor; `on_effect_end` runs only if it was started.
    pub fn end(&mut self, ctx: &mut ProcessorContext<'_>) {
        if self.lifecycle == Lifecycle::Active {
            self.processor.on_effect_end(ctx);
        }
        self.lifecycle = Lifecycle::Ended;
    }
}

/// Active processors of one channel, in priority order.
#[derive(Debug, Clone)]
pub struct EffectPipeline {
    active: Vec<ActiveEffect>,
}

impl Default for EffectPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectPipeline {
    /// Create a pipeline with room for one effect of every kind.
    pub fn new() -> Self {
        Self {
            active: Vec::with_capacity(EffectKind::COUNT),
        }
    }

    /// Processors still active
    pub fn active(&self) -> &[ActiveEffect] {
        &self.active
    }

    /// Retire the previous division's processors and queue `slot`'s effects.
    pub fn begin_division(
        &mut self,
        ctx: &mut ProcessorContext<'_>,
        slot: Option<&DivisionChannel>,
    ) {
        self.end_all(ctx);
        if let Some(slot) = slot {
            for effect in slot.effects() {
                let priority = Priority::of(effect.kind());
                self.insert(ActiveEffect::new(Processor::new(effect), priority));
            }
        }
    }

    /// Stable insertion by priority; never grows past the reserved capacity.
    fn insert(&mut self, effect: ActiveEffect) {
        let index = self
            .active
            .iter()
            .position(|active| active.priority > effect.priority)
            .unwrap_or(self.active.len());
        self.active.insert(index, effect);
    }

    /// Update every processor for one output sample.
    pub fn process(&mut self, ctx: &mut ProcessorContext<'_>, tick_changed: bool) {
        let mut index = 0;
        while index < self.active.len() {
            let effect = &mut self.active[index];
            effect.update(ctx, tick_changed);
            if effect.processor.scope() == Scope::Single {
                effect.end(ctx);
                self.active.remove(index);
            } else {
                index += 1;
            }
        }
    }

    /// End and drop every processor.
    pub fn end_all(&mut self, ctx: &mut ProcessorContext<'_>) {
        for effect in self.active.iter_mut() {
            effect.end(ctx);
        }
        self.active.clear();
    }
}
