use anyhow::Context;
use quickease_api::{AuthToken, NestedComment, PostSummary, PostView, UserId, Uuid};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long)]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Create a user
    CreateUser {
        /// Username
        name: String,

        /// Initial password
        initial_password: String,
    },

    /// List all posts, newest first
    ListPosts,

    /// Print a post along with its comment tree
    ShowPost {
        /// Id of the post
        id: Uuid,
    },
}

fn token_from_env(var: &str) -> anyhow::Result<AuthToken> {
    let tok = std::env::var(var).with_context(|| format!("retrieving {var} environment variable"))?;
    let tok = Uuid::try_parse(&tok).with_context(|| format!("parsing {var} as an auth token"))?;
    Ok(AuthToken(tok))
}

fn print_comments(forest: &[NestedComment]) {
    let mut todo = forest.iter().rev().map(|c| (0, c)).collect::<Vec<_>>();
    while let Some((depth, c)) = todo.pop() {
        println!(
            "{:indent$}[{:+}] {} ({}): {}",
            "",
            c.tally.vote_sum,
            c.comment.user.name,
            c.comment.date,
            c.comment.text,
            indent = depth * 2,
        );
        todo.extend(c.replies.iter().rev().map(|r| (depth + 1, r)));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = <Opt as structopt::StructOpt>::from_args();

    let client = reqwest::Client::new();

    match opt.cmd {
        Command::CreateUser {
            name,
            initial_password,
        } => {
            client
                .post(format!("{}/api/admin/create-user", opt.host))
                .json(&quickease_api::NewUser::new(
                    UserId(Uuid::new_v4()),
                    name,
                    initial_password,
                ))
                .bearer_auth(token_from_env("ADMIN_TOKEN")?.0)
                .send()
                .await?
                .error_for_status()?;
        }
        Command::ListPosts => {
            let posts: Vec<PostSummary> = client
                .get(format!("{}/api/posts", opt.host))
                .bearer_auth(token_from_env("QUICKEASE_TOKEN")?.0)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await
                .context("parsing post list")?;
            for p in posts {
                println!(
                    "{} [{:+}] {} by {}, {} comments",
                    p.post.id.0, p.tally.vote_sum, p.post.title, p.author.name, p.comment_count
                );
            }
        }
        Command::ShowPost { id } => {
            let post: PostView = client
                .get(format!("{}/api/posts/{}", opt.host, id))
                .bearer_auth(token_from_env("QUICKEASE_TOKEN")?.0)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await
                .context("parsing post")?;
            println!(
                "[{:+}] {} by {}, on {}",
                post.tally.vote_sum, post.post.title, post.author.name, post.post.date
            );
            println!("{}", post.post.content);
            println!();
            print_comments(&post.comments);
        }
    }

    Ok(())
}
