use chrono::{Duration, TimeZone, Utc};
use quickease_api::{NewUser, UserId};
use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

const NUM_USERS: usize = 5;
const PASSWORD: &str = "password";

const NUM_POSTS: usize = 40;
const POST_TITLE_LEN: usize = 8;
const POST_CONTENT_LEN: usize = 80;

const NUM_COMMENTS_PER_POST: usize = 15;
const COMMENT_LEN: usize = 25;
const REPLY_PROBABILITY: f64 = 0.6;

const NUM_VOTES: usize = 600;

const NUM_NOTES: usize = 30;
const NUM_FLASHCARDS: usize = 120;
const NUM_QUIZ_RESULTS: usize = 50;

fn gen_n_items(table: &str, n: usize, mut f: impl FnMut(usize) -> String) {
    if n == 0 {
        return;
    }
    println!("INSERT INTO {} VALUES", table);
    for i in 0..n {
        if i != 0 {
            println!(",");
        }
        print!("    {}", f(i));
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn main() {
    let mut rng = rand::thread_rng();
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 8, 0, 0).unwrap();

    // Generate users, all with the same password
    let mut users = Vec::new();
    gen_n_items("users (id, name, password)", NUM_USERS, |i| {
        let u = NewUser::new(
            UserId(Uuid::new_v4()),
            format!("student{i}"),
            String::from(PASSWORD),
        );
        users.push(u.id.0);
        format!(
            "('{}', {}, {})",
            u.id.0,
            quote(&u.name),
            quote(&u.initial_password_hash)
        )
    });
    eprintln!("generated {NUM_USERS} users with password {PASSWORD:?}");

    // Generate posts
    let mut posts = Vec::new();
    gen_n_items("posts", NUM_POSTS, |i| {
        let id = Uuid::new_v4();
        let date = start + Duration::hours(i as i64);
        posts.push((id, date));
        format!(
            "('{}', '{}', '{}', {}, {})",
            id,
            users.choose(&mut rng).unwrap(),
            date,
            quote(&lipsum::lipsum_words_with_rng(&mut rng, POST_TITLE_LEN)),
            quote(&lipsum::lipsum_words_with_rng(&mut rng, POST_CONTENT_LEN)),
        )
    });

    // Generate comments, oldest first so that replies always come after their parent
    let mut comments = Vec::new();
    gen_n_items("comments", NUM_POSTS * NUM_COMMENTS_PER_POST, |i| {
        let (post, post_date) = posts[i / NUM_COMMENTS_PER_POST];
        let nth = i % NUM_COMMENTS_PER_POST;
        let date = post_date + Duration::minutes(nth as i64 + 1);
        let siblings = &comments[comments.len() - nth..];
        let parent = match !siblings.is_empty() && rng.gen_bool(REPLY_PROBABILITY) {
            true => format!("'{}'", siblings.choose(&mut rng).unwrap()),
            false => String::from("NULL"),
        };
        let id = Uuid::new_v4();
        let res = format!(
            "('{}', '{}', {}, '{}', '{}', {})",
            id,
            post,
            parent,
            users.choose(&mut rng).unwrap(),
            date,
            quote(&lipsum::lipsum_words_with_rng(&mut rng, COMMENT_LEN)),
        );
        comments.push(id);
        res
    });

    // Generate votes, duplicates get dropped by ON CONFLICT
    let gen_vote = |rng: &mut rand::rngs::ThreadRng| match rng.gen_bool(0.8) {
        true => 1,
        false => -1,
    };
    gen_n_items("post_votes", NUM_VOTES, |_| {
        format!(
            "('{}', '{}', {})",
            users.choose(&mut rng).unwrap(),
            posts.choose(&mut rng).unwrap().0,
            gen_vote(&mut rng),
        )
    });
    gen_n_items("comment_votes", NUM_VOTES, |_| {
        format!(
            "('{}', '{}', {})",
            users.choose(&mut rng).unwrap(),
            comments.choose(&mut rng).unwrap(),
            gen_vote(&mut rng),
        )
    });

    // Generate study material
    let mut notes = Vec::new();
    gen_n_items("notes", NUM_NOTES, |i| {
        let id = Uuid::new_v4();
        let owner = *users.choose(&mut rng).unwrap();
        notes.push((id, owner));
        format!(
            "('{}', '{}', '{}', {}, {})",
            id,
            owner,
            start + Duration::minutes(i as i64 * 7),
            quote(&lipsum::lipsum_words_with_rng(&mut rng, POST_TITLE_LEN)),
            quote(&lipsum::lipsum_words_with_rng(&mut rng, POST_CONTENT_LEN)),
        )
    });
    gen_n_items("flashcards", NUM_FLASHCARDS, |i| {
        let (note, owner) = *notes.choose(&mut rng).unwrap();
        format!(
            "('{}', '{}', '{}', '{}', {}, {})",
            Uuid::new_v4(),
            owner,
            start + Duration::minutes(i as i64 * 3),
            note,
            quote(&lipsum::lipsum_words_with_rng(&mut rng, 6)),
            quote(&lipsum::lipsum_words_with_rng(&mut rng, 3)),
        )
    });
    gen_n_items("quiz_results", NUM_QUIZ_RESULTS, |i| {
        let total = rng.gen_range(1..=20);
        let score = match rng.gen_bool(0.3) {
            true => total,
            false => rng.gen_range(0..=total),
        };
        format!(
            "('{}', '{}', '{}', {}, {})",
            Uuid::new_v4(),
            users.choose(&mut rng).unwrap(),
            start + Duration::minutes(i as i64 * 11),
            score,
            total,
        )
    });
}
