//! Host container sizing.
//!
//! The container grows with its content between configured bounds. When the
//! formatting toolbar is shown it sits inside the container, so its height is
//! added before clamping. Heights are only written when they change to avoid
//! layout thrash on every keystroke.

use crate::config::AutoHeightConfig;

/// Toolbar bookkeeping for height calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolbarState {
	pub visible: bool,
	pub height: u32,
}

#[derive(Debug, Clone)]
pub struct AutoHeightAdjuster {
	min: u32,
	max: u32,
	toolbar: ToolbarState,
	content: Option<u32>,
	applied: Option<u32>,
}

impl AutoHeightAdjuster {
	pub fn new(config: AutoHeightConfig, toolbar_visible: bool) -> Self {
		Self {
			min: config.min,
			max: config.max,
			toolbar: ToolbarState {
				visible: toolbar_visible,
				height: config.toolbar,
			},
			content: None,
			applied: None,
		}
	}

	/// Records a measured content height. Returns the new container height if
	/// it differs from the last one applied.
	pub fn observe(&mut self, content_height: u32) -> Option<u32> {
		self.content = Some(content_height);
		self.recompute()
	}

	/// Shows or hides the toolbar. Returns the new container height if it
	/// changed.
	pub fn set_toolbar_visible(&mut self, visible: bool) -> Option<u32> {
		if self.toolbar.visible == visible {
			return None;
		}
		self.toolbar.visible = visible;
		self.recompute()
	}

	fn recompute(&mut self) -> Option<u32> {
		let content = self.content?;
		let chrome = if self.toolbar.visible { self.toolbar.height } else { 0 };
		let target = content.saturating_add(chrome).clamp(self.min, self.max);
		if self.applied == Some(target) {
			return None;
		}
		self.applied = Some(target);
		Some(target)
	}

	pub fn toolbar(&self) -> ToolbarState {
		self.toolbar
	}

	pub fn applied(&self) -> Option<u32> {
		self.applied
	}
}
