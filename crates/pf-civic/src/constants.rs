/// The default endpoint for the Civic Information voter info query
pub const DEFAULT_VOTER_INFO_URL: &str = "https://www.googleapis.com/civicinfo/v2/voterinfo";

/// The default base URL for the Nominatim geocoding service
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// The environment variable the API key is read from
pub const API_KEY_ENV_VAR: &str = "CIVIC_API_KEY";

/// Query parameter carrying the API key
pub const API_KEY_PARAM: &str = "key";
pub const ADDRESS_PARAM: &str = "address";
pub const ELECTION_ID_PARAM: &str = "electionId";
pub const OFFICIAL_ONLY_PARAM: &str = "officialOnly";
pub const RETURN_ALL_DATA_PARAM: &str = "returnAllAvailableData";
