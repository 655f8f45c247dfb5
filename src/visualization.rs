// src/visualization.rs

use crate::handoff::Handoff;
use crate::model::ResultSet;
use std::sync::Arc;

/// A pluggable way of drawing result sets onto a surface.
///
/// `draw` is called repeatedly with the same surface; it redraws in place.
pub trait Visualization: Send {
    type Surface: Send;

    fn create_surface(&mut self) -> anyhow::Result<Self::Surface>;

    fn draw(&mut self, surface: &mut Self::Surface, results: &ResultSet) -> anyhow::Result<()>;
}

enum Stage<S> {
    Uninitialized,
    Rendered(S),
}

/// Consumer of result sets. The surface is created on the first delivery
/// and reused for every one after it.
pub struct VisualizationRunner<V: Visualization> {
    vis: V,
    stage: Stage<V::Surface>,
}

impl<V: Visualization> VisualizationRunner<V> {
    pub fn new(vis: V) -> Self {
        Self {
            vis,
            stage: Stage::Uninitialized,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.stage, Stage::Rendered(_))
    }

    pub fn visualization(&self) -> &V {
        &self.vis
    }

    pub fn deliver(&mut self, results: &ResultSet) -> anyhow::Result<()> {
        if let Stage::Rendered(surface) = &mut self.stage {
            tracing::debug!("Redrawing visualization");
            return self.vis.draw(surface, results);
        }

        tracing::info!("Creating visualization surface");
        let mut surface = self.vis.create_surface()?;
        let drawn = self.vis.draw(&mut surface, results);
        // kept even if the first draw failed
        self.stage = Stage::Rendered(surface);
        drawn
    }

    /// Draws every result set it is handed, forever.
    pub fn run(mut self, inbox: Arc<Handoff<Arc<ResultSet>>>) {
        loop {
            let results = inbox.recv();
            if let Err(e) = self.deliver(&results) {
                tracing::warn!("Visualization draw failed: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        surfaces: usize,
        draws: Vec<(usize, usize)>,
        fail_next_draw: bool,
    }

    impl Visualization for Counting {
        type Surface = usize;

        fn create_surface(&mut self) -> anyhow::Result<usize> {
            self.surfaces += 1;
            Ok(self.surfaces)
        }

        fn draw(&mut self, surface: &mut usize, results: &ResultSet) -> anyhow::Result<()> {
            if std::mem::take(&mut self.fail_next_draw) {
                anyhow::bail!("window closed");
            }
            self.draws.push((*surface, results.len()));
            Ok(())
        }
    }

    #[test]
    fn surface_is_created_once() {
        let mut runner = VisualizationRunner::new(Counting::default());
        assert!(!runner.is_rendered());

        runner.deliver(&ResultSet::default()).unwrap();
        assert!(runner.is_rendered());
        runner.deliver(&ResultSet::default()).unwrap();
        runner.deliver(&ResultSet::default()).unwrap();

        let vis = runner.visualization();
        assert_eq!(vis.surfaces, 1);
        assert_eq!(vis.draws, vec![(1, 0), (1, 0), (1, 0)]);
    }

    #[test]
    fn failed_first_draw_keeps_the_surface() {
        let mut runner = VisualizationRunner::new(Counting {
            fail_next_draw: true,
            ..Default::default()
        });

        assert!(runner.deliver(&ResultSet::default()).is_err());
        assert!(runner.is_rendered());
        runner.deliver(&ResultSet::default()).unwrap();
        assert_eq!(runner.visualization().surfaces, 1);
        assert_eq!(runner.visualization().draws.len(), 1);
    }
}
