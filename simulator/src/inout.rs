use crate::{simulator::LaneSimulator, Result, SimulateError, StackValue};

pub fn is_builtin(name: &str) -> bool {
	matches!(name, "putint" | "putch" | "putfloat" | "putarray")
}

fn arg(args: &[StackValue], index: usize, name: &str) -> Result<StackValue> {
	args
		.get(index)
		.copied()
		.ok_or_else(|| SimulateError::Unsupported(format!("{} without argument", name)))
}

impl<'a> LaneSimulator<'a> {
	pub(crate) fn call_builtin(
		&mut self,
		name: &str,
		args: &[StackValue],
	) -> Result<Option<StackValue>> {
		match name {
			"putint" => {
				let value = arg(args, 0, name)?.as_i32()?;
				self.output.push(value.to_string());
			}
			"putch" => {
				let value = arg(args, 0, name)?.as_i32()?;
				let ch = char::from_u32(value as u32).unwrap_or('?');
				self.output.push(ch.to_string());
			}
			"putfloat" => {
				let value = arg(args, 0, name)?.as_f32()?;
				self.output.push(format!("{:.6}", value));
			}
			"putarray" => {
				let len = arg(args, 0, name)?.as_i32()?.max(0) as usize;
				let values = self.read_array(arg(args, 1, name)?, len)?;
				let items: Vec<String> = values
					.iter()
					.map(|v| match v {
						StackValue::Int(v) => v.to_string(),
						StackValue::Float(v) => format!("{:.6}", v),
						StackValue::Ptr(p) => format!("&{}", p),
					})
					.collect();
				self.output.push(format!("{}: {}", len, items.join(" ")));
			}
			_ => return Err(SimulateError::UnknownFunction(name.to_string())),
		}
		Ok(None)
	}
}
