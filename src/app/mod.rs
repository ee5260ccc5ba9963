// Application layer: pipelines wiring domain ports to the shared core steps.

pub mod pipelines;
