use std::collections::HashMap;

use utils::Label;

use crate::{llvmop::Value, temp::Temp};

pub fn all_equal<T: PartialEq>(slice: &[T]) -> bool {
	slice.windows(2).all(|window| window[0] == window[1])
}

pub fn map_value(value: &mut Value, map: &HashMap<Temp, Value>) {
	if let Value::Temp(temp) = value {
		if let Some(new_value) = map.get(temp) {
			*value = new_value.clone();
		}
	}
}

pub fn rename_value(value: &mut Value, map: &HashMap<Temp, Temp>) {
	if let Value::Temp(temp) = value {
		rename_temp(temp, map);
	}
}

pub fn rename_temp(temp: &mut Temp, map: &HashMap<Temp, Temp>) {
	if let Some(new_temp) = map.get(temp) {
		*temp = new_temp.clone();
	}
}

pub fn rename_label(label: &mut Label, map: &HashMap<Label, Label>) {
	if let Some(new_label) = map.get(label) {
		*label = new_label.clone();
	}
}
