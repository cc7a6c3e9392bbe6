//! Stage execution.
//!
//! Runs one declared phase of one physical job against an input/output
//! stream pair: decode records on demand, apply the phase's transformation
//! (batch for map, lazily grouped for combine/reduce), encode the results in
//! emission order. Execution is single-threaded and strictly sequential;
//! partial output already flushed is never rolled back.

use crate::fusestream::pipeline::config::PipelineConfig;
use crate::fusestream::pipeline::error::{PipelineError, PipelineResult};
use crate::fusestream::pipeline::job::{MapReduceJob, Phase};
use crate::fusestream::serialization::record::RecordCodec;
use crate::fusestream::serialization::schema::Schema;
use crate::fusestream::serialization::text::{TextDecoder, TextEncoder};
use std::io::{BufRead, Write};

/// Executes one phase of one job per invocation.
///
/// The runner owns the input-side schema plan; output schemas are derived
/// from the first emitted pair, since a transformation is free to change the
/// record shape.
pub struct StageRunner {
    config: PipelineConfig,
    input_codec: RecordCodec,
}

impl StageRunner {
    pub fn new(
        config: PipelineConfig,
        key_schema: Schema,
        value_schema: Schema,
    ) -> PipelineResult<Self> {
        config.validate()?;
        Ok(StageRunner {
            config,
            input_codec: RecordCodec::new(key_schema, value_schema),
        })
    }

    /// Run `phase` of `job`: consume `input` as far as the transformation
    /// pulls it, write every emitted record to `output` in emission order.
    ///
    /// Records are decoded on demand. A batch map still sees the whole
    /// partition at once, but a grouped combine/reduce holds only the
    /// current group in memory; input past the last record the
    /// transformation consumes is never decoded.
    ///
    /// The host is responsible for key-clustering combine/reduce input
    /// before invocation (an external sort/shuffle over the escaped keys).
    pub fn run<R: BufRead, W: Write>(
        &self,
        job: &MapReduceJob,
        phase: Phase,
        input: R,
        output: &mut W,
    ) -> PipelineResult<()> {
        let transform = job
            .transform(phase)
            .ok_or_else(|| PipelineError::unsupported_phase(phase, job.phases()))?;

        let mut decoder = TextDecoder::new(input, self.config.escaper()?);
        log::debug!("running {} phase", phase);

        // A decode failure ends the stream early; the stashed error takes
        // precedence over whatever the transformation made of the partial
        // input.
        let mut decode_error: Option<PipelineError> = None;
        let result = {
            let codec = &self.input_codec;
            let decoded = std::iter::from_fn(|| match codec.read_pair(&mut decoder) {
                Ok(pair) => pair,
                Err(error) => {
                    decode_error = Some(error);
                    None
                }
            });
            transform.apply_stream(decoded)
        };
        if let Some(error) = decode_error {
            return Err(error);
        }
        let emitted = result?;

        let mut encoder = TextEncoder::new(output, self.config.escaper()?);
        let mut output_codec: Option<RecordCodec> = None;
        let mut written = 0usize;
        for pair in &emitted {
            if output_codec.is_none() {
                output_codec = Some(RecordCodec::new(
                    Schema::of_value(&pair.0)?,
                    Schema::of_value(&pair.1)?,
                ));
            }
            if let Some(codec) = &output_codec {
                codec.write_pair(&mut encoder, pair)?;
                written += 1;
            }
        }
        encoder.flush()?;
        log::debug!("{} phase emitted {} records", phase, written);
        Ok(())
    }
}
