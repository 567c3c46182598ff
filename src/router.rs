use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Home,
    Tasks,
    Timer,
}

impl View {
    pub const ALL: [View; 3] = [View::Home, View::Tasks, View::Timer];

    pub fn label(&self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Tasks => "Tasks",
            View::Timer => "Timer",
        }
    }

    pub fn hotkey(&self) -> char {
        match self {
            View::Home => '1',
            View::Tasks => '2',
            View::Timer => '3',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub view: View,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavControl {
    pub view: View,
    pub active: bool,
}

/// Shows one panel at a time and highlights its nav control.
#[derive(Debug, Clone)]
pub struct ViewRouter {
    panels: Vec<Panel>,
    nav: Vec<NavControl>,
}

impl ViewRouter {
    pub fn new(initial: View) -> Self {
        let mut router = ViewRouter {
            panels: View::ALL
                .iter()
                .map(|&view| Panel { view, hidden: true })
                .collect(),
            nav: View::ALL
                .iter()
                .map(|&view| NavControl {
                    view,
                    active: false,
                })
                .collect(),
        };
        router.show(initial);
        router
    }

    pub fn show(&mut self, view: View) {
        for panel in &mut self.panels {
            panel.hidden = panel.view != view;
        }
        for control in &mut self.nav {
            control.active = control.view == view;
        }
    }

    pub fn active(&self) -> View {
        self.panels
            .iter()
            .find(|p| !p.hidden)
            .map(|p| p.view)
            .unwrap_or_default()
    }

    pub fn active_index(&self) -> usize {
        self.nav.iter().position(|c| c.active).unwrap_or(0)
    }

    pub fn next(&mut self) {
        let idx = (self.active_index() + 1) % View::ALL.len();
        self.show(View::ALL[idx]);
    }

    pub fn prev(&mut self) {
        let idx = (self.active_index() + View::ALL.len() - 1) % View::ALL.len();
        self.show(View::ALL[idx]);
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn nav(&self) -> &[NavControl] {
        &self.nav
    }
}

impl Default for ViewRouter {
    fn default() -> Self {
        ViewRouter::new(View::Home)
    }
}
