pub use super::recommendation_records::Entity as RecommendationRecords;
