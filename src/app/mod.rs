// Application layer: the pipelines the CLI runs through `EtlEngine`.

pub mod pipelines;
