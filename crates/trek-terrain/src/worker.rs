//! Background thread that generates and rescales terrain meshes.
//!
//! The owning model submits jobs and collects outputs once per tick via
//! [`MeshWorker::drain_outputs`]. Mesh work never blocks the update pass.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::warn;

use crate::elevation::{ElevationError, ElevationSource};
use crate::generator::{GeneratedMesh, RescaledVertices, generate_mesh, rescale_mesh};
use crate::mesh_data::TerrainMeshMetadata;
use crate::variant::TerrainVariant;

/// Work item for the mesh thread.
pub(crate) enum MeshJob {
    Generate {
        variant: TerrainVariant,
        metadata: TerrainMeshMetadata,
        source: Arc<dyn ElevationSource>,
    },
    Rescale {
        variant: TerrainVariant,
        reference: Arc<GeneratedMesh>,
        radius: f32,
        scale: f32,
    },
}

/// Completed work item.
pub(crate) enum MeshOutput {
    Generated(Result<GeneratedMesh, ElevationError>),
    Rescaled(RescaledVertices),
}

pub(crate) struct MeshWorker {
    job_sender: Option<Sender<MeshJob>>,
    output_receiver: Receiver<MeshOutput>,
    handle: Option<JoinHandle<()>>,
}

impl MeshWorker {
    /// Spawn the worker thread.
    pub(crate) fn spawn() -> std::io::Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<MeshJob>();
        let (out_tx, out_rx) = crossbeam_channel::unbounded();

        let handle = std::thread::Builder::new()
            .name("terrain-mesh-worker".into())
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let output = match job {
                        MeshJob::Generate {
                            variant,
                            metadata,
                            source,
                        } => MeshOutput::Generated(generate_mesh(
                            variant,
                            &metadata,
                            source.as_ref(),
                        )),
                        MeshJob::Rescale {
                            variant,
                            reference,
                            radius,
                            scale,
                        } => MeshOutput::Rescaled(rescale_mesh(variant, &reference, radius, scale)),
                    };
                    if out_tx.send(output).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            job_sender: Some(job_tx),
            output_receiver: out_rx,
            handle: Some(handle),
        })
    }

    /// Queue a job. Returns `false` after shutdown.
    pub(crate) fn submit(&self, job: MeshJob) -> bool {
        match &self.job_sender {
            Some(sender) => sender.send(job).is_ok(),
            None => {
                warn!("Mesh worker already shut down; dropping job");
                false
            }
        }
    }

    /// Collect every finished job.
    pub(crate) fn drain_outputs(&self) -> Vec<MeshOutput> {
        self.output_receiver.try_iter().collect()
    }

    /// Close the job queue and join the thread.
    pub(crate) fn shutdown(&mut self) {
        self.job_sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MeshWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
