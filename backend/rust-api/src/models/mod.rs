pub mod attempt;
pub mod question;
pub mod user;

pub use attempt::*;
pub use question::{AnswerResponse, Difficulty, Question, QuestionType};
pub use user::{LeaderboardEntry, LeaderboardPage, NewUser, PlayerProfile, Progress, User};
