use std::time::Duration;

use crate::params::{ParamSource, ParamType, ParameterTable};

pub const ATTRIBUTE_SLOTS: usize = 4;

/// Receives the resolved parameter values of a frame.
pub trait RenderSink {
    fn set_uniform(&mut self, name: &str, bytes: &[u8], ty: ParamType);
    fn push_vertex_attributes(&mut self, attributes: [f32; ATTRIBUTE_SLOTS]);
}

/// Environment values available to computed parameter sources.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameEnv {
    pub elapsed: f32,
    pub delta: f32,
    pub width: u32,
    pub height: u32,
}

/// Fixed-timestep clock.
#[derive(Debug)]
pub struct FrameClock {
    step: f32,
    frame: u64,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self {
            step: 1.0 / fps.max(1) as f32,
            frame: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f32(self.step)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advances one step and returns the environment for the new frame.
    pub fn tick(&mut self, width: u32, height: u32) -> FrameEnv {
        let env = FrameEnv {
            elapsed: self.frame as f32 * self.step,
            delta: self.step,
            width,
            height,
        };
        self.frame += 1;
        env
    }
}

/// Resolves computed sources and routes every parameter to its target.
///
/// The attribute buffer persists between frames; parameters targeting an
/// attribute slot overwrite it starting at that slot. Values wider than the
/// remaining slots are cut off at the last slot.
#[derive(Debug, Default)]
pub struct FrameEvaluator {
    attributes: [u32; ATTRIBUTE_SLOTS],
}

impl FrameEvaluator {
    pub fn new(attributes: [f32; ATTRIBUTE_SLOTS]) -> Self {
        Self {
            attributes: attributes.map(f32::to_bits),
        }
    }

    pub fn attributes(&self) -> [f32; ATTRIBUTE_SLOTS] {
        self.attributes.map(f32::from_bits)
    }

    pub fn evaluate(&mut self, params: &mut ParameterTable, env: &FrameEnv, sink: &mut dyn RenderSink) {
        for param in params.iter_mut() {
            match param.source {
                ParamSource::UserEdited => {}
                ParamSource::ElapsedTime => param.value.set_float(0, env.elapsed),
                ParamSource::FrameDeltaTime => param.value.set_float(0, env.delta),
                ParamSource::ScreenWidth | ParamSource::ScreenHeight => {
                    let size = if param.source == ParamSource::ScreenWidth {
                        env.width
                    } else {
                        env.height
                    };
                    if param.ty.is_int() {
                        param.value.set_int(0, size as i32);
                    } else {
                        param.value.set_float(0, size as f32);
                    }
                }
            }

            let width = param.ty.byte_width();
            match param.target.attribute_slot() {
                None => sink.set_uniform(&param.name, &param.value.as_bytes()[..width], param.ty),
                Some(slot) => {
                    let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.attributes[..]);
                    let start = slot * 4;
                    let len = width.min(bytes.len() - start);
                    bytes[start..start + len].copy_from_slice(&param.value.as_bytes()[..len]);
                }
            }
        }
        log::trace!("vertex attributes {:?}", self.attributes());
        sink.push_vertex_attributes(self.attributes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{parse_parameters, ParamTarget, ParameterDescriptor};

    #[derive(Default)]
    struct RecordingSink {
        uniforms: Vec<(String, Vec<u8>, ParamType)>,
        attributes: Vec<[f32; 4]>,
    }

    impl RenderSink for RecordingSink {
        fn set_uniform(&mut self, name: &str, bytes: &[u8], ty: ParamType) {
            self.uniforms.push((name.to_string(), bytes.to_vec(), ty));
        }

        fn push_vertex_attributes(&mut self, attributes: [f32; 4]) {
            self.attributes.push(attributes);
        }
    }

    fn env() -> FrameEnv {
        FrameEnv {
            elapsed: 2.5,
            delta: 0.25,
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn computed_sources_overwrite_every_frame() {
        let mut table = parse_parameters(
            "// @param name=t type=float source=time default=99\n\
             // @param name=dt type=float source=delta_time\n\
             // @param name=w type=int source=screen.w\n\
             // @param name=h type=float source=screen.h\n",
        )
        .table;
        let mut sink = RecordingSink::default();
        let mut evaluator = FrameEvaluator::default();

        evaluator.evaluate(&mut table, &env(), &mut sink);
        assert_eq!(table.get("t").unwrap().value.float(0), 2.5);
        assert_eq!(table.get("dt").unwrap().value.float(0), 0.25);
        assert_eq!(table.get("w").unwrap().value.int(0), 640);
        assert_eq!(table.get("h").unwrap().value.float(0), 480.0);

        table.get_mut("t").unwrap().value.set_float(0, 42.0);
        let later = FrameEnv { elapsed: 3.0, ..env() };
        evaluator.evaluate(&mut table, &later, &mut sink);
        assert_eq!(table.get("t").unwrap().value.float(0), 3.0);
    }

    #[test]
    fn user_values_pass_through_to_uniforms() {
        let mut table = parse_parameters(
            "// @param name=offset type=float2 default.x=1 default.y=2\n",
        )
        .table;
        let mut sink = RecordingSink::default();
        FrameEvaluator::default().evaluate(&mut table, &env(), &mut sink);

        assert_eq!(sink.uniforms.len(), 1);
        let (name, bytes, ty) = &sink.uniforms[0];
        assert_eq!(name, "offset");
        assert_eq!(*ty, ParamType::Float2);
        assert_eq!(bytes.len(), 8);
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, vec![1.0, 2.0]);
        assert_eq!(sink.attributes, vec![[0.0; 4]]);
    }

    #[test]
    fn attribute_targets_write_type_width() {
        let mut table = ParameterTable::new();
        let mut p = ParameterDescriptor::new("rg", ParamType::Float2);
        p.target = ParamTarget::AttributeSlot1;
        p.value = crate::params::schema::ParamValue::from_floats([0.5, 0.75, 9.0, 9.0]);
        table.insert(p);

        let mut sink = RecordingSink::default();
        let mut evaluator = FrameEvaluator::new([1.0, 1.0, 1.0, 1.0]);
        evaluator.evaluate(&mut table, &env(), &mut sink);

        assert!(sink.uniforms.is_empty());
        assert_eq!(sink.attributes, vec![[1.0, 0.5, 0.75, 1.0]]);
    }

    #[test]
    fn wide_attribute_values_stop_at_last_slot() {
        let mut table = ParameterTable::new();
        let mut p = ParameterDescriptor::new("color", ParamType::Float4);
        p.target = ParamTarget::AttributeSlot2;
        p.value = crate::params::schema::ParamValue::from_floats([0.1, 0.2, 0.3, 0.4]);
        table.insert(p);

        let mut evaluator = FrameEvaluator::default();
        let mut sink = RecordingSink::default();
        evaluator.evaluate(&mut table, &env(), &mut sink);
        assert_eq!(evaluator.attributes(), [0.0, 0.0, 0.1, 0.2]);
    }

    #[test]
    fn clock_steps_at_fixed_rate() {
        let mut clock = FrameClock::new(4);
        let first = clock.tick(10, 20);
        let second = clock.tick(10, 20);
        assert_eq!(first.elapsed, 0.0);
        assert_eq!(second.elapsed, 0.25);
        assert_eq!(second.delta, 0.25);
        assert_eq!(clock.frame(), 2);
    }
}
