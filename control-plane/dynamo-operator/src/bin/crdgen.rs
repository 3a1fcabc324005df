use dynamo_operator::crd::nim_deployment::DynamoNimDeployment;
use kube::core::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = DynamoNimDeployment::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
