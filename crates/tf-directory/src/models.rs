use serde::{Deserialize, Serialize};

/// Response from the peoplehub search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub people: Vec<Profile>,
}

/// An Xbox Live user profile as returned by peoplehub.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub xuid: String,
    pub gamertag: String,
    pub display_name: String,
    pub real_name: String,
    pub display_pic_raw: String,
    pub gamer_score: String,
    pub modern_gamertag: String,
    pub modern_gamertag_suffix: String,
    pub unique_modern_gamertag: String,
    pub xbox_one_rep: String,
    pub presence_state: String,
    pub presence_text: String,
    pub is_favorite: bool,
    pub is_following_caller: bool,
    pub is_followed_by_caller: bool,
    pub is_broadcasting: bool,
    pub is_quarantined: bool,
    pub is_xbox360_gamerpic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ProfileDetail>,
}

/// Extended profile details.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileDetail {
    pub account_tier: String,
    pub bio: String,
    pub is_verified: bool,
    pub location: String,
    pub tenure: String,
    pub blocked: bool,
    pub mute: bool,
    pub follower_count: i64,
    pub following_count: i64,
    pub has_game_pass: bool,
}
