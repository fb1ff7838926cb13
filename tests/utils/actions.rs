use codeconquer::{
    game::{
        types::{MoveOutcome, SessionView, SpecialCardOutcome, SpecialCardRequest},
        SpecialCard,
    },
    AppError,
};

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

#[allow(dead_code)]
impl TestSetup {
    pub async fn view(&self) -> SessionView {
        self.service.session_view(&self.session_id).await.unwrap()
    }

    /// Rolls the d6 for `name` with the next die showing `value`
    pub async fn roll(&self, name: &str, value: u8) -> Result<MoveOutcome, AppError> {
        self.dice.push(value);
        self.service.roll_d6(&self.session_id, &self.id(name)).await
    }

    pub async fn choose(&self, name: &str, to_node_id: &str) -> Result<MoveOutcome, AppError> {
        self.service
            .choose_path(&self.session_id, &self.id(name), to_node_id)
            .await
    }

    pub async fn play_card(
        &self,
        name: &str,
        card: SpecialCard,
        target: Option<&str>,
    ) -> Result<SpecialCardOutcome, AppError> {
        let request = SpecialCardRequest {
            player_id: self.id(name),
            card,
            target_player_id: target.map(|t| self.id(t)),
            boost_to_node_id: None,
        };
        self.service
            .apply_special_card(&self.session_id, &request)
            .await
    }

    /// Starts the challenge on `name`'s node and reports it solved
    pub async fn solve_challenge(&self, name: &str) -> i64 {
        let challenge = self
            .service
            .start_challenge(&self.session_id, &self.id(name), None)
            .await
            .unwrap();
        self.service
            .submit_score(&self.session_id, &self.id(name), &challenge.challenge_id, 1)
            .await
            .unwrap()
            .points_awarded
    }

    pub async fn current_player(&self) -> String {
        let view = self.view().await;
        let current = view.current_player_id.expect("no current player");
        self.players
            .iter()
            .find(|(_, id)| *id == current)
            .map(|(name, _)| name.clone())
            .expect("current player is not part of the setup")
    }

    pub async fn position(&self, name: &str) -> String {
        let id = self.id(name);
        self.view()
            .await
            .players
            .into_iter()
            .find(|p| p.id == id)
            .map(|p| p.position_node_id)
            .expect("player left the session")
    }
}
