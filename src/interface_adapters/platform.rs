// In-memory implementation of the platform port.
//
// The world task owns one per match: network events update the roster, life
// state and positions, and the controller's side effects (notices, markers,
// pings, scoreboard rows, round end) are recorded here until the next world
// update drains them. Unit tests use it the same way.

use crate::domain::ports::{
    Audience, MarkerHandle, MarkerStyle, Notice, Platform, PlatformError, ScoreboardColumn,
    ScoreboardRow, SpotMode,
};
use crate::domain::state::{PlayerId, RosterEntry, TeamId, Vec3};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimMarker {
    pub handle: MarkerHandle,
    pub owner: TeamId,
    pub subject: PlayerId,
    pub style: MarkerStyle,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotRecord {
    pub player_id: PlayerId,
    pub duration: Duration,
    pub mode: SpotMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeRecord {
    pub audience: Audience,
    pub notice: Notice,
}

#[derive(Debug, Clone, Copy)]
struct SimPlayer {
    team_id: TeamId,
    alive: bool,
    position: Option<Vec3>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreboardLayout {
    pub columns: &'static [ScoreboardColumn],
    pub sort_column: usize,
    pub ascending: bool,
}

#[derive(Debug)]
pub struct SimPlatform {
    // Ordered so roster order is stable join order by id.
    players: BTreeMap<PlayerId, SimPlayer>,
    markers: BTreeMap<u64, SimMarker>,
    next_marker_id: u64,
    notices: Vec<NoticeRecord>,
    spots: Vec<SpotRecord>,
    scoreboard_layout: Option<ScoreboardLayout>,
    scoreboard: BTreeMap<PlayerId, ScoreboardRow>,
    time_limit: Duration,
    now: Duration,
    // Outer None: round still running.
    round_result: Option<Option<TeamId>>,
    fail_marker_calls: bool,
}

impl SimPlatform {
    pub fn new(time_limit: Duration) -> Self {
        Self {
            players: BTreeMap::new(),
            markers: BTreeMap::new(),
            next_marker_id: 1,
            notices: Vec::new(),
            spots: Vec::new(),
            scoreboard_layout: None,
            scoreboard: BTreeMap::new(),
            time_limit,
            now: Duration::ZERO,
            round_result: None,
            fail_marker_calls: false,
        }
    }

    /// Adds a player who has not deployed yet. Re-adding keeps life state.
    pub fn add_player(&mut self, player_id: PlayerId, team_id: TeamId) {
        self.players
            .entry(player_id)
            .and_modify(|player| player.team_id = team_id)
            .or_insert(SimPlayer {
                team_id,
                alive: false,
                position: None,
            });
    }

    pub fn remove_player(&mut self, player_id: PlayerId) -> bool {
        self.scoreboard.remove(&player_id);
        self.players.remove(&player_id).is_some()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    pub fn set_team(&mut self, player_id: PlayerId, team_id: TeamId) -> bool {
        match self.players.get_mut(&player_id) {
            Some(player) => {
                player.team_id = team_id;
                true
            }
            None => false,
        }
    }

    pub fn set_alive(&mut self, player_id: PlayerId, alive: bool) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.alive = alive;
        }
    }

    pub fn set_position(&mut self, player_id: PlayerId, position: Vec3) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.position = Some(position);
        }
    }

    /// Moves the match clock forward; it never goes backwards.
    pub fn advance(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn markers(&self) -> Vec<SimMarker> {
        self.markers.values().copied().collect()
    }

    pub fn marker_for(&self, owner: TeamId, subject: PlayerId) -> Option<SimMarker> {
        self.markers
            .values()
            .find(|marker| marker.owner == owner && marker.subject == subject)
            .copied()
    }

    pub fn notices(&self) -> &[NoticeRecord] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<NoticeRecord> {
        std::mem::take(&mut self.notices)
    }

    pub fn spots(&self) -> &[SpotRecord] {
        &self.spots
    }

    pub fn take_spots(&mut self) -> Vec<SpotRecord> {
        std::mem::take(&mut self.spots)
    }

    pub fn scoreboard_layout(&self) -> Option<ScoreboardLayout> {
        self.scoreboard_layout
    }

    /// Scoreboard rows in display order.
    pub fn scoreboard_rows(&self) -> Vec<ScoreboardRow> {
        let mut rows: Vec<ScoreboardRow> = self.scoreboard.values().copied().collect();
        let ascending = self
            .scoreboard_layout
            .map(|layout| layout.ascending)
            .unwrap_or(true);
        rows.sort_by_key(|row| row.sort_key);
        if !ascending {
            rows.reverse();
        }
        rows
    }

    pub fn round_result(&self) -> Option<Option<TeamId>> {
        self.round_result
    }

    /// Makes every marker call fail, to exercise error paths.
    pub fn fail_marker_calls(&mut self, fail: bool) {
        self.fail_marker_calls = fail;
    }

    /// Drops markers behind the controller's back.
    pub fn drop_all_markers(&mut self) {
        self.markers.clear();
    }

    fn check_marker_calls(&self) -> Result<(), PlatformError> {
        if self.fail_marker_calls {
            return Err(PlatformError::Rejected("marker calls disabled".to_string()));
        }
        Ok(())
    }
}

impl Platform for SimPlatform {
    fn roster(&self) -> Vec<RosterEntry> {
        self.players
            .iter()
            .map(|(player_id, player)| RosterEntry {
                player_id: *player_id,
                team_id: player.team_id,
            })
            .collect()
    }

    fn team_of(&self, player_id: PlayerId) -> Option<TeamId> {
        self.players.get(&player_id).map(|player| player.team_id)
    }

    fn is_alive(&self, player_id: PlayerId) -> bool {
        self.players
            .get(&player_id)
            .is_some_and(|player| player.alive)
    }

    fn position(&self, player_id: PlayerId) -> Option<Vec3> {
        self.players
            .get(&player_id)
            .and_then(|player| player.position)
    }

    fn notify(&mut self, audience: Audience, notice: Notice) {
        self.notices.push(NoticeRecord { audience, notice });
    }

    fn spawn_marker(
        &mut self,
        owner: TeamId,
        subject: PlayerId,
        style: MarkerStyle,
        position: Vec3,
    ) -> Result<MarkerHandle, PlatformError> {
        self.check_marker_calls()?;
        if !self.players.contains_key(&subject) {
            return Err(PlatformError::UnknownPlayer(subject));
        }
        let handle = MarkerHandle(self.next_marker_id);
        self.next_marker_id += 1;
        self.markers.insert(
            handle.0,
            SimMarker {
                handle,
                owner,
                subject,
                style,
                position,
            },
        );
        Ok(handle)
    }

    fn move_marker(&mut self, handle: MarkerHandle, position: Vec3) -> Result<(), PlatformError> {
        self.check_marker_calls()?;
        let marker = self
            .markers
            .get_mut(&handle.0)
            .ok_or(PlatformError::UnknownMarker(handle))?;
        marker.position = position;
        Ok(())
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<(), PlatformError> {
        self.check_marker_calls()?;
        self.markers
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(PlatformError::UnknownMarker(handle))
    }

    fn spot(&mut self, player_id: PlayerId, duration: Duration, mode: SpotMode) {
        self.spots.push(SpotRecord {
            player_id,
            duration,
            mode,
        });
    }

    fn configure_scoreboard(
        &mut self,
        columns: &'static [ScoreboardColumn],
        sort_column: usize,
        ascending: bool,
    ) {
        self.scoreboard_layout = Some(ScoreboardLayout {
            columns,
            sort_column,
            ascending,
        });
    }

    fn set_scoreboard_row(&mut self, row: ScoreboardRow) {
        if self.players.contains_key(&row.player_id) {
            self.scoreboard.insert(row.player_id, row);
        }
    }

    fn remaining_time(&self) -> Duration {
        self.time_limit.saturating_sub(self.now)
    }

    fn end_round(&mut self, winner: Option<TeamId>) {
        if self.round_result.is_none() {
            self.round_result = Some(winner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_players_added_then_roster_lists_them_in_id_order() {
        let mut platform = SimPlatform::new(Duration::from_secs(60));
        platform.add_player(9, 2);
        platform.add_player(3, 1);
        platform.add_player(5, 2);

        let ids: Vec<PlayerId> = platform.roster().iter().map(|entry| entry.player_id).collect();
        assert_eq!(ids, vec![3, 5, 9]);
        assert_eq!(platform.members_of(2), vec![5, 9]);
        assert!(!platform.is_alive(3));
    }

    #[test]
    fn when_marker_handle_is_unknown_then_calls_fail() {
        let mut platform = SimPlatform::new(Duration::from_secs(60));
        let handle = MarkerHandle(77);

        assert_eq!(
            platform.move_marker(handle, Vec3::default()),
            Err(PlatformError::UnknownMarker(handle))
        );
        assert_eq!(
            platform.remove_marker(handle),
            Err(PlatformError::UnknownMarker(handle))
        );
    }

    #[test]
    fn when_clock_advances_then_remaining_time_shrinks_to_zero() {
        let mut platform = SimPlatform::new(Duration::from_secs(60));
        platform.advance(Duration::from_secs(45));
        platform.advance(Duration::from_secs(10));
        assert_eq!(platform.remaining_time(), Duration::from_secs(15));

        platform.advance(Duration::from_secs(90));
        assert_eq!(platform.remaining_time(), Duration::ZERO);
    }

    #[test]
    fn when_round_ended_twice_then_first_result_is_kept() {
        let mut platform = SimPlatform::new(Duration::from_secs(60));
        platform.end_round(Some(2));
        platform.end_round(None);
        assert_eq!(platform.round_result(), Some(Some(2)));
    }
}
