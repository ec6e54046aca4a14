use super::Session;
use crate::types::{AdversaryMode, CollectibleTier, RuntimeEvent, SessionState, Vec2};

/// Strict less-than against the summed radii; there is no near-miss grace
/// band.
fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    a.distance_to(b) < a_radius + b_radius
}

impl Session {
    /// Per-tick proximity effects: collectible consumption, captures and
    /// agent death. Skipped entirely while the agent is dead.
    pub(super) fn resolve_collisions(&mut self) {
        if !self.agent.alive {
            return;
        }

        for idx in 0..self.collectibles.len() {
            if self.collectibles[idx].consumed {
                continue;
            }
            let (pos, radius, tier) = {
                let collectible = &self.collectibles[idx];
                (collectible.pos, collectible.radius, collectible.tier)
            };
            if !circles_overlap(self.agent.pos, self.agent.radius, pos, radius) {
                continue;
            }

            self.collectibles[idx].consumed = true;
            self.events.push(RuntimeEvent::CollectibleConsumed {
                tier,
                x: pos.x,
                y: pos.y,
            });
            match tier {
                CollectibleTier::Standard => self.add_score(self.config.standard_value),
                CollectibleTier::Bonus => {
                    self.add_score(self.config.bonus_value);
                    for adversary in &mut self.adversaries {
                        adversary.frighten(&self.config);
                    }
                }
            }
        }

        for idx in 0..self.adversaries.len() {
            if !self.agent.alive {
                break;
            }
            let overlap = circles_overlap(
                self.agent.pos,
                self.agent.radius,
                self.adversaries[idx].pos,
                self.adversaries[idx].radius,
            );
            if !overlap {
                continue;
            }

            if self.adversaries[idx].mode == AdversaryMode::Evade
                && !self.adversaries[idx].captured
            {
                self.adversaries[idx].capture(&self.config);
                self.captures += 1;
                self.events.push(RuntimeEvent::AdversaryCaptured {
                    id: self.adversaries[idx].id,
                });
                self.add_score(self.config.capture_value);
            } else if !self.adversaries[idx].captured {
                self.kill_agent();
            }
        }
    }

    /// Exactly one life per death event; the alive check in the collision
    /// loop keeps a second overlapping adversary from double counting.
    fn kill_agent(&mut self) {
        self.agent.alive = false;
        self.agent.death_elapsed_ms = 0.0;
        self.lives -= 1;
        self.deaths += 1;
        self.requested_dir = None;
        self.events.push(RuntimeEvent::AgentDied {
            lives_left: self.lives,
        });
        self.events.push(RuntimeEvent::LivesChanged { lives: self.lives });
    }

    /// Victory once every collectible of both tiers is consumed. The state
    /// transition out of Playing makes the bonus unrepeatable.
    pub(super) fn check_exhaustion(&mut self) {
        if !self.agent.alive || self.state != SessionState::Playing {
            return;
        }
        if self.collectibles.iter().all(|c| c.consumed) {
            self.add_score(self.config.victory_value);
            self.events.push(RuntimeEvent::Victory);
            self.set_state(SessionState::Victory);
        }
    }
}
