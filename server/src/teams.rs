//! Team service: the context object that owns the team core.
//!
//! Built once at startup and owned by the server loop, which is the single
//! serialized context for every side effect of a team change. The registry
//! and notifier are handed out as `Arc`s so other tasks can read assignments
//! or register listeners without going through the loop.

use crate::directory::{ConnectedPlayer, PlayerDirectory, PrivilegeCheck};
use crate::network::OutboundMessage;
use crate::notifier::ChangeNotifier;
use crate::registry::MembershipRegistry;
use crate::scoreboard::{Scoreboard, TeamVisuals};
use log::{error, info, warn};
use shared::{Packet, PlayerId, Roster, TeamAssignment, TeamCatalog, TeamError};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct TeamService<V: TeamVisuals = Scoreboard> {
    catalog: Arc<TeamCatalog>,
    registry: Arc<MembershipRegistry>,
    notifier: Arc<ChangeNotifier>,
    visuals: V,
    outbound: mpsc::UnboundedSender<OutboundMessage>,
}

impl<V: TeamVisuals> TeamService<V> {
    pub fn new(
        catalog: TeamCatalog,
        mut visuals: V,
        outbound: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        visuals.init_teams(&catalog);
        info!(
            "Team service ready with teams: {}",
            catalog.team_ids().collect::<Vec<_>>().join(", ")
        );

        Self {
            registry: Arc::new(MembershipRegistry::new(Arc::clone(&catalog))),
            notifier: Arc::new(ChangeNotifier::new()),
            catalog,
            visuals,
            outbound,
        }
    }

    pub fn catalog(&self) -> &Arc<TeamCatalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<MembershipRegistry> {
        &self.registry
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    pub fn visuals(&self) -> &V {
        &self.visuals
    }

    /// Assigns a team and runs every side effect of the change.
    ///
    /// Order: registry, world visuals, listeners, then one full roster
    /// broadcast. A visual failure is logged and does not undo the change.
    pub fn assign(
        &mut self,
        player_id: PlayerId,
        team_id: &str,
        directory: &dyn PlayerDirectory,
    ) -> Result<TeamAssignment, TeamError> {
        let assignment = self.registry.assign(player_id, team_id)?;
        info!("Player {} assigned to team {}", player_id, team_id);

        if let Err(e) = self.visuals.apply_team_visual(player_id, team_id) {
            warn!("Failed to apply team visuals for player {}: {}", player_id, e);
        }

        self.notifier.notify(player_id, team_id);
        self.broadcast_roster(directory);

        Ok(assignment)
    }

    /// Handles a change request coming from a connected player.
    ///
    /// Returns the player that was moved.
    pub fn handle_change_request(
        &mut self,
        requester: &ConnectedPlayer,
        target_name: &str,
        team_id: &str,
        directory: &dyn PlayerDirectory,
        privilege: &dyn PrivilegeCheck,
    ) -> Result<ConnectedPlayer, TeamError> {
        if !privilege.has_elevated_privilege(requester) {
            return Err(TeamError::PermissionDenied);
        }

        let target = directory
            .find_by_display_name(target_name)
            .ok_or_else(|| TeamError::PlayerNotFound(target_name.to_string()))?;

        self.assign(target.id, team_id, directory)?;
        Ok(target)
    }

    /// Drops the player's assignment. Returns true if they had a team.
    pub fn remove(&mut self, player_id: PlayerId) -> bool {
        self.visuals.clear_player(player_id);
        self.registry
            .remove(player_id)
            .map(|assignment| assignment.has_team())
            .unwrap_or(false)
    }

    /// Fresh roster of connected players that have a team
    pub fn snapshot(&self, directory: &dyn PlayerDirectory) -> Roster {
        directory
            .connected_players()
            .into_iter()
            .filter_map(|player| {
                self.registry
                    .get(player.id)
                    .map(|team_id| (player.name, team_id))
            })
            .collect()
    }

    /// Sends one freshly computed roster to every connected client
    pub fn broadcast_roster(&self, directory: &dyn PlayerDirectory) {
        let packet = Packet::roster(&self.snapshot(directory));
        if let Err(e) = self
            .outbound
            .send(OutboundMessage::BroadcastPacket { packet })
        {
            error!("Failed to queue roster broadcast: {}", e);
        }
    }

    pub fn shutdown(&mut self) {
        self.registry.clear();
        self.notifier.clear();
        self.visuals.clear();
        info!("Team service shut down");
    }
}
