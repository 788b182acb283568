use std::time::Instant;
use crate::data::{ConfigOrt, Xs, Y};
use crate::utils;

pub trait InferenceProcess: Sized {
    type Input; // DynamicImage

    /// Creates a new instance of the model with the given options.
    fn new(options: ConfigOrt) -> anyhow::Result<Self>;

    /// Pre-process the input data.
    fn preprocess(&self, x: &Self::Input) -> anyhow::Result<(Xs, f32)>;

    /// Executes the model on the preprocessed data.
    fn inference(&mut self, xs: Xs) -> anyhow::Result<Xs>;

    /// Post-process the model's output.
    fn postprocess(&self, xs: Xs, x0: &Self::Input, ratio: f32, threshold: f32) -> anyhow::Result<Y>;

    /// Executes the full pipeline.
    fn run(&mut self, x: &Self::Input, threshold: f32) -> anyhow::Result<Y> {
        let detect_time = Instant::now();
        let mut _detect_elapsed = detect_time.elapsed();

        let (ys, ratio) = self.preprocess(x)?;
        _detect_elapsed = utils::trace("TIME", "Preprocessing input", detect_time, _detect_elapsed);

        let ys = self.inference(ys)?;
        _detect_elapsed = utils::trace("TIME", "Detection run", detect_time, _detect_elapsed);

        let ys = self.postprocess(ys, x, ratio, threshold)?;
        utils::trace("TIME", "Postprocessing", detect_time, _detect_elapsed);

        Ok(ys)
    }
}
