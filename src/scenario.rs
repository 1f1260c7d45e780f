use std::sync::Arc;
use std::time::Duration;

use crate::bridge::canvas::{BridgeDeps, BridgeState, CanvasSurfaceBridge, SurfaceInfo};
use crate::bridge::config::BridgeConfig;
use crate::bridge::events::{BridgeEvent, EventLog};
use crate::bridge::hibernation::HibernationPhase;
use crate::bridge::mailbox::{HandoffResource, MailboxHandoff};
use crate::foundation::core::AccelerationHint;
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::gpu::context::{GpuContext, Mailbox};
use crate::gpu::emulated::EmulatedGpuContext;
use crate::gpu::registry::ContextRegistry;
use crate::raster::draw::DrawCommand;
use crate::scheduler::task::TaskQueue;
use crate::surface::image::Image;

/// The emulated GPU a scenario starts with.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioGpu {
    /// Without a GPU the bridge renders unaccelerated from the start.
    pub enabled: bool,
    pub max_texture_bytes: Option<usize>,
}

impl Default for ScenarioGpu {
    fn default() -> Self {
        Self {
            enabled: true,
            max_texture_bytes: None,
        }
    }
}

/// One scripted action against the bridge or its environment.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    Draw {
        commands: Vec<DrawCommand>,
    },
    Flush,
    RequestSurface,
    SetHidden {
        hidden: bool,
    },
    /// Run the posted tasks that are ready.
    RunTasks,
    AdvanceTime {
        ms: u64,
    },
    LoseContext,
    FailAllocations {
        count: u32,
    },
    Snapshot {
        name: String,
        #[serde(default)]
        hint: AccelerationHint,
    },
    Handoff,
    /// Run the release callback of the `handoff`-th handoff of the scenario.
    Release {
        handoff: usize,
        #[serde(default)]
        resource_lost: bool,
    },
    /// Drop the release callback of a handoff without running it.
    DropHandoff {
        handoff: usize,
    },
    /// Replace the GPU with a fresh context.
    RestoreAcceleration,
    DisableDeferral,
    Teardown,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draw { .. } => "draw",
            Self::Flush => "flush",
            Self::RequestSurface => "request_surface",
            Self::SetHidden { .. } => "set_hidden",
            Self::RunTasks => "run_tasks",
            Self::AdvanceTime { .. } => "advance_time",
            Self::LoseContext => "lose_context",
            Self::FailAllocations { .. } => "fail_allocations",
            Self::Snapshot { .. } => "snapshot",
            Self::Handoff => "handoff",
            Self::Release { .. } => "release",
            Self::DropHandoff { .. } => "drop_handoff",
            Self::RestoreAcceleration => "restore_acceleration",
            Self::DisableDeferral => "disable_deferral",
            Self::Teardown => "teardown",
        }
    }
}

/// A scripted bridge session, as read from JSON.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub config: BridgeConfig,
    #[serde(default)]
    pub gpu: ScenarioGpu,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json_str(s: &str) -> BridgeResult<Self> {
        let scenario: Self = serde_json::from_str(s)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        self.config.validate()?;
        let mut handoffs = 0usize;
        for (idx, step) in self.steps.iter().enumerate() {
            match step {
                Step::Handoff => handoffs += 1,
                Step::Release { handoff, .. } | Step::DropHandoff { handoff }
                    if *handoff >= handoffs =>
                {
                    return Err(BridgeError::validation(format!(
                        "step {idx}: handoff {handoff} is not produced by an earlier step"
                    )));
                }
                Step::Snapshot { name, .. } if name.is_empty() || name.contains(['/', '\\']) => {
                    return Err(BridgeError::validation(format!(
                        "step {idx}: snapshot name must be a non-empty file stem, got '{name}'"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct HandoffReport {
    pub index: usize,
    pub mailbox: Mailbox,
    pub accelerated: bool,
    pub generation: u64,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub state: BridgeState,
    pub accelerated: bool,
    pub hibernation: HibernationPhase,
    pub valid: bool,
    pub events: Vec<BridgeEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<SurfaceInfo>,
    /// Whether a snapshot or handoff step produced something.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub produced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffReport>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepReport>,
    pub final_state: BridgeState,
    pub outstanding_handoffs: usize,
    /// Textures alive on the current GPU context when the script ended.
    pub live_textures: usize,
}

pub struct NamedSnapshot {
    pub name: String,
    pub image: Image,
}

pub struct ScenarioOutcome {
    pub report: ScenarioReport,
    pub snapshots: Vec<NamedSnapshot>,
}

struct Runner {
    bridge: CanvasSurfaceBridge,
    gpu: Option<Arc<EmulatedGpuContext>>,
    queue: Arc<TaskQueue>,
    log: Arc<EventLog>,
    handoffs: Vec<Option<MailboxHandoff>>,
    snapshots: Vec<NamedSnapshot>,
}

/// Drive a bridge through `scenario` on an emulated GPU and a virtual-time task queue.
#[tracing::instrument(skip(scenario), fields(steps = scenario.steps.len()))]
pub fn run_scenario(scenario: &Scenario) -> BridgeResult<ScenarioOutcome> {
    scenario.validate()?;
    let gpu = scenario.gpu.enabled.then(|| {
        let gpu = EmulatedGpuContext::new();
        gpu.set_max_texture_bytes(scenario.gpu.max_texture_bytes);
        gpu
    });
    let queue = TaskQueue::new();
    let log = EventLog::new();
    let deps = BridgeDeps {
        context: gpu.clone().map(|g| -> Arc<dyn GpuContext> { g }),
        registry: ContextRegistry::new(),
        task_runner: queue.clone(),
        observer: Some(log.observer()),
    };
    let mut runner = Runner {
        bridge: CanvasSurfaceBridge::new(scenario.config.clone(), deps)?,
        gpu,
        queue,
        log,
        handoffs: Vec::new(),
        snapshots: Vec::new(),
    };

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        tracing::debug!(index, op = step.name(), "scenario step");
        let (produced, handoff) = runner.apply(step)?;
        let bridge = &runner.bridge;
        steps.push(StepReport {
            index,
            op: step.name(),
            state: bridge.state(),
            accelerated: bridge.is_accelerated(),
            hibernation: bridge.hibernation_phase(),
            valid: bridge.is_valid(),
            events: runner.log.take(),
            surface: bridge.surface_info(),
            produced,
            handoff,
        });
    }

    let report = ScenarioReport {
        steps,
        final_state: runner.bridge.state(),
        outstanding_handoffs: runner.bridge.outstanding_handoffs(),
        live_textures: runner.gpu.as_ref().map_or(0, |g| g.live_textures()),
    };
    Ok(ScenarioOutcome {
        report,
        snapshots: runner.snapshots,
    })
}

impl Runner {
    fn apply(&mut self, step: &Step) -> BridgeResult<(Option<bool>, Option<HandoffReport>)> {
        match step {
            Step::Draw { commands } => self.bridge.draw(commands.iter().cloned()),
            Step::Flush => self.bridge.flush(),
            Step::RequestSurface => {
                return Ok((Some(self.bridge.request_surface().is_some()), None));
            }
            Step::SetHidden { hidden } => self.bridge.set_hidden(*hidden),
            Step::RunTasks => {
                self.queue.run_pending();
            }
            Step::AdvanceTime { ms } => {
                self.queue.advance_time(Duration::from_millis(*ms));
            }
            Step::LoseContext => {
                if let Some(gpu) = &self.gpu {
                    gpu.lose_context();
                }
            }
            Step::FailAllocations { count } => {
                if let Some(gpu) = &self.gpu {
                    gpu.fail_next_allocations(*count);
                }
            }
            Step::Snapshot { name, hint } => {
                let image = self.bridge.snapshot(*hint);
                let produced = image.is_some();
                if let Some(image) = image {
                    self.snapshots.push(NamedSnapshot {
                        name: name.clone(),
                        image,
                    });
                }
                return Ok((Some(produced), None));
            }
            Step::Handoff => {
                let index = self.handoffs.len();
                let handoff = self.bridge.prepare_frame_handoff();
                let report = handoff.as_ref().map(|h| HandoffReport {
                    index,
                    mailbox: h.mailbox(),
                    accelerated: matches!(h.resource(), HandoffResource::Texture { .. }),
                    generation: h.generation(),
                });
                let produced = handoff.is_some();
                self.handoffs.push(handoff);
                return Ok((Some(produced), report));
            }
            Step::Release {
                handoff,
                resource_lost,
            } => {
                if let Some(h) = self.handoff(*handoff)? {
                    let token = match h.resource() {
                        HandoffResource::Texture { sync_token, .. } => Some(*sync_token),
                        HandoffResource::SharedBitmap { .. } => None,
                    };
                    h.release().run(token, *resource_lost);
                }
            }
            Step::DropHandoff { handoff } => {
                self.handoff(*handoff)?;
            }
            Step::RestoreAcceleration => {
                let gpu = EmulatedGpuContext::new();
                self.bridge.restore_acceleration(gpu.clone());
                self.gpu = Some(gpu);
            }
            Step::DisableDeferral => self.bridge.disable_deferral(),
            Step::Teardown => self.bridge.begin_teardown(),
        }
        Ok((None, None))
    }

    /// Take a handoff out of the script's hands. `None` if it failed or was already used.
    fn handoff(&mut self, index: usize) -> BridgeResult<Option<MailboxHandoff>> {
        let slot = self.handoffs.get_mut(index).ok_or_else(|| {
            BridgeError::validation(format!("handoff {index} has not been produced"))
        })?;
        Ok(slot.take())
    }
}

#[cfg(test)]
#[path = "../tests/unit/scenario.rs"]
mod tests;
